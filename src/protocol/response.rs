//! Response message types

use serde::{Deserialize, Serialize};

use crate::core::types::{ConnectionStatus, NetworkRecord, ScanStatus};

const STATUS_OK: &str = "ok";

/// Responses to control socket requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    ScanResults(ScanResultsResponse),

    Status(StatusResponse),

    CheckConnection(CheckConnectionResponse),

    /// Acknowledgement for requests without a result
    Ok(OkResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub status: String,
}

/// Response for get_scan_results request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanResultsResponse {
    pub status: String,
    pub scan_status: ScanStatus,
    pub networks: Vec<NetworkRecord>,
}

/// Response for get_status request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(flatten)]
    pub connection: ConnectionStatus,
    pub scan_status: ScanStatus,
}

/// Response for check_connection request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckConnectionResponse {
    pub status: String,
    pub connected: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
        }
    }
}

impl ScanResultsResponse {
    pub fn ok(scan_status: ScanStatus, networks: Vec<NetworkRecord>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            scan_status,
            networks,
        }
    }
}

impl StatusResponse {
    pub fn ok(connection: ConnectionStatus, scan_status: ScanStatus) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            connection,
            scan_status,
        }
    }
}

impl CheckConnectionResponse {
    pub fn ok(connected: bool) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AuthenticationKind;

    #[test]
    fn test_ok_response() {
        let json = serde_json::to_string(&Response::Ok(OkResponse::ok())).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_scan_results_response() {
        let networks = vec![NetworkRecord {
            name: "TestNet".to_string(),
            bssid: "aa:bb:cc:dd:ee:ff".to_string(),
            signal_level: -65,
            authentication: AuthenticationKind::Wpa2Psk,
            wps_available: false,
            connected: false,
            wps_device_name: None,
            wps_primary_device_type: None,
        }];

        let response = ScanResultsResponse::ok(ScanStatus::ScanOk, networks);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""scan_status":"scan_ok""#));
        assert!(json.contains(r#""authentication":"wpa2_psk""#));
        assert!(!json.contains("wps_device_name"));

        let deserialized: ScanResultsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, response);
    }

    #[test]
    fn test_status_response_flattens_connection() {
        let connection = ConnectionStatus {
            name: "MyNetwork".to_string(),
            bssid: "aa:bb:cc:dd:ee:ff".to_string(),
            ip_address: "192.168.1.100".to_string(),
            mac_address: "02:00:00:00:00:01".to_string(),
            connected: true,
            signal_strength: -52,
        };

        let response = StatusResponse::ok(connection, ScanStatus::Idle);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["connected"], true);
        assert_eq!(value["name"], "MyNetwork");
        assert_eq!(value["signal_strength"], -52);
        assert_eq!(value["scan_status"], "idle");
    }

    #[test]
    fn test_check_connection_response() {
        let json = serde_json::to_string(&CheckConnectionResponse::ok(false)).unwrap();
        assert_eq!(json, r#"{"status":"ok","connected":false}"#);
    }
}
