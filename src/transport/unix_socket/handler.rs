//! JSON-RPC request handler for Unix socket transport

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    backend::{ControlChannel, PowerControl},
    core::{driver::WifiDriver, error::WifiResult},
    protocol::{
        CheckConnectionResponse, JoinParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
        OkResponse, Request, RequestId, RespondToAuthParams, Response, ScanResultsResponse,
        SetPollingParams, StatusResponse, WpsPushButtonParams,
    },
};

/// Maps JSON-RPC requests onto driver operations
pub struct RequestHandler<C: ControlChannel, P: PowerControl> {
    driver: Arc<WifiDriver<C, P>>,
}

impl<C: ControlChannel, P: PowerControl> RequestHandler<C, P> {
    pub fn new(driver: Arc<WifiDriver<C, P>>) -> Self {
        Self { driver }
    }

    /// Decodes one request line and produces its response
    pub async fn handle_line(&self, line: &str) -> JsonRpcResponse {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparsable request: {}", e);
                return JsonRpcResponse::error(JsonRpcError::parse_error(), RequestId::Null);
            }
        };

        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value(id).ok())
            .unwrap_or(RequestId::Null);
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(?method, "Invalid JSON-RPC request: {}", e);
                let error = match method {
                    None => JsonRpcError::invalid_request("missing method"),
                    Some(method) if !is_known_method(&method) => JsonRpcError::method_not_found(),
                    Some(_) => JsonRpcError::invalid_params(e.to_string()),
                };
                JsonRpcResponse::error(error, id)
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;
        debug!(method = request.request.method(), ?id, "Request");

        let result = match request.request {
            Request::Scan => self.driver.start_scan().await.map(|()| ok()),
            Request::GetScanResults => Ok(self.handle_get_scan_results().await),
            Request::Join(JoinParams { ssid, password }) => {
                self.driver.join(&ssid, &password).await.map(|()| ok())
            }
            Request::Reset => self.driver.reset().await.map(|()| ok()),
            Request::TurnOn => {
                self.driver.turn_on().await;
                Ok(ok())
            }
            Request::TurnOff => {
                self.driver.turn_off().await;
                Ok(ok())
            }
            Request::GetStatus => Ok(self.handle_get_status().await),
            Request::CheckConnection => self
                .driver
                .check_connection()
                .await
                .map(|connected| Response::CheckConnection(CheckConnectionResponse::ok(connected))),
            Request::WpsPushButton(params) => {
                return self.handle_wps_push_button(params, id).await;
            }
            Request::RespondToAuth(RespondToAuthParams {
                field,
                network_id,
                value,
            }) => self
                .driver
                .respond_to_auth(field, network_id, &value)
                .await
                .map(|()| ok()),
            Request::SetPolling(params) => Ok(self.handle_set_polling(params)),
        };

        respond(result, id)
    }

    async fn handle_get_scan_results(&self) -> Response {
        Response::ScanResults(ScanResultsResponse::ok(
            self.driver.scan_status().await,
            self.driver.scan_results().await,
        ))
    }

    async fn handle_get_status(&self) -> Response {
        Response::Status(StatusResponse::ok(
            self.driver.status().await,
            self.driver.scan_status().await,
        ))
    }

    async fn handle_wps_push_button(
        &self,
        params: WpsPushButtonParams,
        id: RequestId,
    ) -> JsonRpcResponse {
        let network = self
            .driver
            .scan_results()
            .await
            .into_iter()
            .find(|network| network.bssid.eq_ignore_ascii_case(&params.bssid));

        match network {
            Some(network) => respond(
                self.driver.wps_push_button_auth(&network).await.map(|()| ok()),
                id,
            ),
            None => JsonRpcResponse::error(
                JsonRpcError::invalid_params(format!("no scanned network {}", params.bssid)),
                id,
            ),
        }
    }

    fn handle_set_polling(&self, params: SetPollingParams) -> Response {
        if let Some(enabled) = params.status {
            self.driver.set_status_polling(enabled);
        }
        if let Some(enabled) = params.signal {
            self.driver.set_signal_polling(enabled);
        }
        ok()
    }
}

fn ok() -> Response {
    Response::Ok(OkResponse::ok())
}

fn respond(result: WifiResult<Response>, id: RequestId) -> JsonRpcResponse {
    match result {
        Ok(response) => JsonRpcResponse::success(response, id),
        Err(e) => {
            warn!("Request failed: {}", e);
            JsonRpcResponse::error(JsonRpcError::from(&e), id)
        }
    }
}

fn is_known_method(method: &str) -> bool {
    matches!(
        method,
        "scan"
            | "get_scan_results"
            | "join"
            | "reset"
            | "turn_on"
            | "turn_off"
            | "get_status"
            | "check_connection"
            | "wps_push_button"
            | "respond_to_auth"
            | "set_polling"
    )
}
