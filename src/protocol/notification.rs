//! Notification message types (driver-to-consumer events)

use serde::{Deserialize, Serialize};

use crate::core::types::{AuthField, NetworkRecord, PendingAuthRequest, ScanStatus};

/// Change notifications raised by the driver
///
/// Every variant is a copy of driver state at the moment of the change;
/// consumers never observe the driver's caches directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", content = "params")]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// Coarse connected/disconnected transition
    ConnectionStateChanged(ConnectionStateChangedParams),

    NetworkNameChanged(ValueChangedParams<String>),

    IpAddressChanged(ValueChangedParams<String>),

    MacAddressChanged(ValueChangedParams<String>),

    SignalStrengthChanged(ValueChangedParams<i32>),

    ScanStatusChanged(ScanStatusChangedParams),

    /// Complete replacement set of scan results
    NetworksFound(NetworksFoundParams),

    AuthenticationRequested(PendingAuthRequest),

    AuthenticationResponded(AuthenticationRespondedParams),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStateChangedParams {
    pub connected: bool,
}

/// Field-level change notification parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueChangedParams<T> {
    pub value: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanStatusChangedParams {
    pub status: ScanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworksFoundParams {
    pub networks: Vec<NetworkRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticationRespondedParams {
    pub field: AuthField,
    pub network_id: i32,
}

impl Notification {
    pub fn connection(connected: bool) -> Self {
        Notification::ConnectionStateChanged(ConnectionStateChangedParams { connected })
    }

    pub fn scan_status(status: ScanStatus) -> Self {
        Notification::ScanStatusChanged(ScanStatusChangedParams { status })
    }

    pub fn networks_found(networks: Vec<NetworkRecord>) -> Self {
        Notification::NetworksFound(NetworksFoundParams { networks })
    }

    pub fn network_name(value: impl Into<String>) -> Self {
        Notification::NetworkNameChanged(ValueChangedParams {
            value: value.into(),
        })
    }

    pub fn ip_address(value: impl Into<String>) -> Self {
        Notification::IpAddressChanged(ValueChangedParams {
            value: value.into(),
        })
    }

    pub fn mac_address(value: impl Into<String>) -> Self {
        Notification::MacAddressChanged(ValueChangedParams {
            value: value.into(),
        })
    }

    pub fn signal_strength(value: i32) -> Self {
        Notification::SignalStrengthChanged(ValueChangedParams { value })
    }

    pub fn auth_responded(field: AuthField, network_id: i32) -> Self {
        Notification::AuthenticationResponded(AuthenticationRespondedParams { field, network_id })
    }
}
