//! JSON-RPC 2.0 message envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    core::error::WifiError,
    protocol::{notification::Notification, request::Request, response::Response},
};

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub request: Request,
    pub id: RequestId,
}

/// JSON-RPC 2.0 response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: RequestId,
}

/// JSON-RPC 2.0 notification wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Request ID (number or string)
///
/// `Null` answers requests whose id could not be determined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC error codes and driver specific codes
impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const CHANNEL_UNAVAILABLE: i32 = -32001;
    pub const REQUEST_FAILED: i32 = -32002;
    pub const JOIN_FAILED: i32 = -32003;
    pub const TIMEOUT: i32 = -32004;

    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(Self::PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    pub fn method_not_found() -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }
}

impl From<&WifiError> for JsonRpcError {
    fn from(error: &WifiError) -> Self {
        let code = match error {
            WifiError::ChannelUnavailable { .. } => Self::CHANNEL_UNAVAILABLE,
            WifiError::RequestFailed { .. } => Self::REQUEST_FAILED,
            WifiError::PartialJoinFailure { .. } => Self::JOIN_FAILED,
            WifiError::Timeout { .. } => Self::TIMEOUT,
            WifiError::InvalidParameter(_) => Self::INVALID_PARAMS,
            WifiError::Io(_) | WifiError::Protocol(_) => Self::INTERNAL_ERROR,
        };

        let mut rpc_error = Self::new(code, error.to_string());
        if let WifiError::PartialJoinFailure { step, .. } = error {
            rpc_error.data = Some(serde_json::json!({ "step": step }));
        }
        rpc_error
    }
}

impl JsonRpcRequest {
    pub fn new(request: Request, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            request,
            id,
        }
    }
}

impl JsonRpcResponse {
    pub fn success(result: Response, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(error: JsonRpcError, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

impl JsonRpcNotification {
    pub fn new(notification: Notification) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            notification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::types::{JoinStep, ScanStatus},
        protocol::response::OkResponse,
    };

    #[test]
    fn test_jsonrpc_request_serialization() {
        let request = JsonRpcRequest::new(Request::Scan, RequestId::Number(1));
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""method":"scan""#));
        assert!(json.contains(r#""id":1"#));

        let deserialized: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, request);
    }

    #[test]
    fn test_jsonrpc_request_with_params() {
        let json = r#"{"jsonrpc":"2.0","method":"wps_push_button","params":{"bssid":"aa:bb:cc:dd:ee:ff"},"id":"abc-123"}"#;
        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.id, RequestId::String("abc-123".to_string()));
        assert_eq!(request.request.method(), "wps_push_button");
    }

    #[test]
    fn test_jsonrpc_response_success() {
        let response = JsonRpcResponse::success(Response::Ok(OkResponse::ok()), RequestId::Number(1));
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""result":{"status":"ok"}"#));
        assert!(!json.contains(r#""error""#));
        assert!(json.contains(r#""id":1"#));
    }

    #[test]
    fn test_jsonrpc_response_error() {
        let response = JsonRpcResponse::error(JsonRpcError::method_not_found(), RequestId::Number(1));
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""code":-32601"#));
        assert!(!json.contains(r#""result""#));

        let deserialized: JsonRpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, response);
    }

    #[test]
    fn test_jsonrpc_parse_error_has_null_id() {
        let response = JsonRpcResponse::error(JsonRpcError::parse_error(), RequestId::Null);
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""id":null"#));

        let deserialized: JsonRpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, response);
    }

    #[test]
    fn test_jsonrpc_notification() {
        let notification =
            JsonRpcNotification::new(Notification::scan_status(ScanStatus::ScanFailed));
        let json = serde_json::to_string(&notification).unwrap();

        assert!(json.contains(r#""method":"scan_status_changed""#));
        assert!(json.contains(r#""status":"scan_failed""#));
        assert!(!json.contains(r#""id""#));

        let deserialized: JsonRpcNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, notification);
    }

    #[test]
    fn test_driver_error_mapping() {
        let err = WifiError::RequestFailed {
            command: "SCAN".into(),
        };
        assert_eq!(JsonRpcError::from(&err).code, JsonRpcError::REQUEST_FAILED);

        let err = WifiError::InvalidParameter("empty SSID".into());
        assert_eq!(JsonRpcError::from(&err).code, JsonRpcError::INVALID_PARAMS);

        let err = WifiError::RequestFailed {
            command: "SAVE_CONFIG".into(),
        }
        .at_join_step(JoinStep::SaveConfig);
        let rpc = JsonRpcError::from(&err);
        assert_eq!(rpc.code, JsonRpcError::JOIN_FAILED);
        assert_eq!(rpc.data, Some(serde_json::json!({ "step": "save_config" })));
    }
}
