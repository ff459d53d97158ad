//! Request message types

use serde::{Deserialize, Serialize};

use crate::core::types::AuthField;

/// Requests from a control socket client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", content = "params")]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// Start a scan; results follow as a networks_found notification
    Scan,

    /// Last enumerated scan results
    GetScanResults,

    Join(JoinParams),

    /// Remove all network profiles and switch the radio off
    Reset,

    TurnOn,

    TurnOff,

    /// Cached connection status
    GetStatus,

    /// Re-read the status from the daemon
    CheckConnection,

    WpsPushButton(WpsPushButtonParams),

    RespondToAuth(RespondToAuthParams),

    SetPolling(SetPollingParams),
}

impl Request {
    /// Method name, safe for logging
    pub fn method(&self) -> &'static str {
        match self {
            Request::Scan => "scan",
            Request::GetScanResults => "get_scan_results",
            Request::Join(_) => "join",
            Request::Reset => "reset",
            Request::TurnOn => "turn_on",
            Request::TurnOff => "turn_off",
            Request::GetStatus => "get_status",
            Request::CheckConnection => "check_connection",
            Request::WpsPushButton(_) => "wps_push_button",
            Request::RespondToAuth(_) => "respond_to_auth",
            Request::SetPolling(_) => "set_polling",
        }
    }
}

/// Parameters for join request
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinParams {
    pub ssid: String,

    /// Passphrase, or a derived key of 64 hex characters
    pub password: String,
}

impl std::fmt::Debug for JoinParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinParams")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parameters for wps_push_button request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WpsPushButtonParams {
    /// Access point from the last scan results
    pub bssid: String,
}

/// Parameters for respond_to_auth request
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RespondToAuthParams {
    pub field: AuthField,
    pub network_id: i32,
    pub value: String,
}

impl std::fmt::Debug for RespondToAuthParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespondToAuthParams")
            .field("field", &self.field)
            .field("network_id", &self.network_id)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Parameters for set_polling request; omitted toggles are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetPollingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<bool>,
}
