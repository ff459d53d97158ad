//! Classification of unsolicited control channel messages

use crate::core::{
    error::{WifiError, WifiResult},
    types::{AuthField, PendingAuthRequest},
};

const CTRL_REQ: &str = "CTRL-REQ-";
const SCAN_RESULTS: &str = "CTRL-EVENT-SCAN-RESULTS";
const SCAN_STARTED: &str = "CTRL-EVENT-SCAN-STARTED";
const SCAN_FAILED: &str = "CTRL-EVENT-SCAN-FAILED";
const CONNECTED: &str = "CTRL-EVENT-CONNECTED";
const DISCONNECTED: &str = "CTRL-EVENT-DISCONNECTED";
const TERMINATING: &str = "CTRL-EVENT-TERMINATING";
const NETWORK_NOT_FOUND: &str = "CTRL-EVENT-NETWORK-NOT-FOUND";
const WPS_AP_AVAILABLE_PBC: &str = "WPS-AP-AVAILABLE-PBC";
const WPS_PBC_ACTIVE: &str = "WPS-PBC-ACTIVE";

/// Priority assumed for messages without a `<N>` marker
pub const DEFAULT_PRIORITY: u8 = 2;

/// Unsolicited message kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AuthRequest(PendingAuthRequest),
    ScanResults,
    ScanStarted,
    ScanFailed,
    Connected,
    Disconnected,
    Terminating,
    NetworkNotFound,
    WpsAvailable,
    WpsActive,
    Unrecognized(String),
}

/// Splits the optional `<N>` priority marker from a message
///
/// A marker without the closing `>` is not a marker: the whole message is
/// returned with the default priority.
pub fn strip_priority(msg: &str) -> (u8, &str) {
    if let Some(rest) = msg.strip_prefix('<') {
        if let Some((level, text)) = rest.split_once('>') {
            return (level.trim().parse().unwrap_or(DEFAULT_PRIORITY), text);
        }
    }
    (DEFAULT_PRIORITY, msg)
}

/// Classifies a raw message read from the monitor socket
///
/// Fails only for malformed interactive authentication requests; every
/// other unmatched text becomes [`Event::Unrecognized`].
pub fn parse_event(msg: &str) -> WifiResult<Event> {
    let (_, text) = strip_priority(msg);
    let text = text.trim_end_matches(['\n', '\r', '\0']);

    let event = if let Some(request) = text.strip_prefix(CTRL_REQ) {
        Event::AuthRequest(parse_auth_request(request)?)
    } else if text.starts_with(SCAN_RESULTS) {
        Event::ScanResults
    } else if text.starts_with(SCAN_STARTED) {
        Event::ScanStarted
    } else if text.starts_with(SCAN_FAILED) {
        Event::ScanFailed
    } else if text.starts_with(CONNECTED) {
        Event::Connected
    } else if text.starts_with(WPS_AP_AVAILABLE_PBC) {
        Event::WpsAvailable
    } else if text.starts_with(NETWORK_NOT_FOUND) {
        Event::NetworkNotFound
    } else if text.starts_with(DISCONNECTED) {
        Event::Disconnected
    } else if text.starts_with(TERMINATING) {
        Event::Terminating
    } else if text.starts_with(WPS_PBC_ACTIVE) {
        Event::WpsActive
    } else {
        Event::Unrecognized(text.to_string())
    };

    Ok(event)
}

/// Parses `<FIELD>-<network id>:<prompt>` (the part after `CTRL-REQ-`)
fn parse_auth_request(request: &str) -> WifiResult<PendingAuthRequest> {
    let malformed = || WifiError::Protocol(format!("malformed CTRL-REQ: {request:?}"));

    let (field, rest) = request.split_once('-').ok_or_else(malformed)?;
    let (network_id, prompt) = rest.split_once(':').ok_or_else(malformed)?;
    let network_id = network_id.parse::<i32>().map_err(|_| malformed())?;
    let field = field.parse::<AuthField>()?;

    Ok(PendingAuthRequest {
        field,
        network_id,
        prompt: prompt.to_string(),
    })
}
