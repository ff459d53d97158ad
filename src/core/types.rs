//! Domain types for the wpa_supplicant driver

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::core::error::WifiError;

/// Signal level reported when the daemon has no measurement
pub const UNKNOWN_SIGNAL_LEVEL: i32 = -100;

/// A discovered access point, one per scan result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkRecord {
    /// Network SSID
    pub name: String,
    /// Hardware address of the access point
    pub bssid: String,
    /// Signal level in dBm
    pub signal_level: i32,
    pub authentication: AuthenticationKind,
    pub wps_available: bool,
    /// True for the access point the interface is associated with
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wps_device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wps_primary_device_type: Option<String>,
}

/// Authentication scheme advertised by an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationKind {
    NoneOpen,
    NoneWep,
    NoneWepShared,
    WpaPsk,
    Wpa2Psk,
    WpaEap,
    Wpa2Eap,
}

/// Cached view of the current association
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub name: String,
    pub bssid: String,
    pub ip_address: String,
    pub mac_address: String,
    pub connected: bool,
    /// Last polled signal strength in dBm
    pub signal_strength: i32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            name: String::new(),
            bssid: String::new(),
            ip_address: String::new(),
            mac_address: String::new(),
            connected: false,
            signal_strength: UNKNOWN_SIGNAL_LEVEL,
        }
    }
}

/// Scan cycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
    ScanOk,
    ScanFailed,
}

/// Credential field the daemon may request during authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthField {
    Identity,
    Password,
    NewPassword,
    Pin,
    Otp,
    Passphrase,
}

impl AuthField {
    /// Field name as used in `CTRL-REQ-` / `CTRL-RSP-` messages
    pub fn as_wire(self) -> &'static str {
        match self {
            AuthField::Identity => "IDENTITY",
            AuthField::Password => "PASSWORD",
            AuthField::NewPassword => "NEW_PASSWORD",
            AuthField::Pin => "PIN",
            AuthField::Otp => "OTP",
            AuthField::Passphrase => "PASSPHRASE",
        }
    }
}

impl FromStr for AuthField {
    type Err = WifiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDENTITY" => Ok(AuthField::Identity),
            "PASSWORD" => Ok(AuthField::Password),
            "NEW_PASSWORD" => Ok(AuthField::NewPassword),
            "PIN" => Ok(AuthField::Pin),
            "OTP" => Ok(AuthField::Otp),
            "PASSPHRASE" => Ok(AuthField::Passphrase),
            other => Err(WifiError::Protocol(format!(
                "unknown authentication field: {other}"
            ))),
        }
    }
}

impl fmt::Display for AuthField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Interactive authentication request raised by the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingAuthRequest {
    pub field: AuthField,
    pub network_id: i32,
    pub prompt: String,
}

/// Steps of the join sequence, reported when one of them fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStep {
    RemoveNetworks,
    AddNetwork,
    SetSsid,
    SetKeyMgmt,
    SetPsk,
    SaveConfig,
    EnableNetwork,
    Reassociate,
}

impl JoinStep {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinStep::RemoveNetworks => "remove_networks",
            JoinStep::AddNetwork => "add_network",
            JoinStep::SetSsid => "set_ssid",
            JoinStep::SetKeyMgmt => "set_key_mgmt",
            JoinStep::SetPsk => "set_psk",
            JoinStep::SaveConfig => "save_config",
            JoinStep::EnableNetwork => "enable_network",
            JoinStep::Reassociate => "reassociate",
        }
    }
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session identifier for control socket clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_field_wire_names() {
        for field in [
            AuthField::Identity,
            AuthField::Password,
            AuthField::NewPassword,
            AuthField::Pin,
            AuthField::Otp,
            AuthField::Passphrase,
        ] {
            assert_eq!(field.as_wire().parse::<AuthField>().unwrap(), field);
        }
    }

    #[test]
    fn test_auth_field_rejects_unknown() {
        let err = "SIM".parse::<AuthField>().unwrap_err();
        assert!(matches!(err, WifiError::Protocol(_)));
        assert!("password".parse::<AuthField>().is_err());
    }

    #[test]
    fn test_scan_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::ScanFailed).unwrap(),
            r#""scan_failed""#
        );
        assert_eq!(ScanStatus::default(), ScanStatus::Idle);
    }

    #[test]
    fn test_connection_status_default_signal() {
        let status = ConnectionStatus::default();
        assert!(!status.connected);
        assert_eq!(status.signal_strength, UNKNOWN_SIGNAL_LEVEL);
    }

    #[test]
    fn test_network_record_serialization() {
        let record = NetworkRecord {
            name: "home".into(),
            bssid: "aa:bb:cc:dd:ee:ff".into(),
            signal_level: -55,
            authentication: AuthenticationKind::Wpa2Psk,
            wps_available: false,
            connected: true,
            wps_device_name: None,
            wps_primary_device_type: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""authentication":"wpa2_psk""#));
        assert!(!json.contains("wps_device_name"));
    }
}
