//! wpa_supplicant control protocol codec
//!
//! Commands are single-line ASCII strings; responses are either a short
//! status token (`OK`, `FAIL`, a network id) or a body of `key=value` lines.

use std::fmt;

use crate::core::{
    error::{WifiError, WifiResult},
    types::{AuthField, AuthenticationKind, UNKNOWN_SIGNAL_LEVEL},
};

/// Prefix of a response reporting that the daemon rejected a command
pub const FAILURE_MARKER: &str = "FAIL";

const UNKNOWN_COMMAND: &str = "UNKNOWN COMMAND";

/// Returns true if `response` is an explicit failure from the daemon
pub fn is_failure(response: &str) -> bool {
    response.starts_with(FAILURE_MARKER) || response.starts_with(UNKNOWN_COMMAND)
}

/// Value of a `SET_NETWORK` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkValue {
    /// Sent inside double quotes (strings, passphrases)
    Quoted(String),
    /// Sent verbatim (keywords, numbers, hex strings)
    Raw(String),
}

impl NetworkValue {
    /// Encodes an SSID, falling back to hex when it cannot be quoted
    pub fn ssid(ssid: &str) -> Self {
        if ssid.chars().any(|c| c == '"' || c.is_control()) {
            NetworkValue::Raw(hex::encode(ssid.as_bytes()))
        } else {
            NetworkValue::Quoted(ssid.to_string())
        }
    }

    /// Encodes a PSK: a 64 hex digit key is already derived and goes unquoted
    pub fn psk(password: &str) -> Self {
        if is_hex_psk(password) {
            NetworkValue::Raw(password.to_string())
        } else {
            NetworkValue::Quoted(password.to_string())
        }
    }
}

impl fmt::Display for NetworkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkValue::Quoted(v) => write!(f, "\"{v}\""),
            NetworkValue::Raw(v) => f.write_str(v),
        }
    }
}

/// Returns true for a pre-hashed PSK (exactly 64 hex digits)
pub fn is_hex_psk(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Commands understood by the daemon's control interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    SignalPoll,
    Scan,
    Bss(usize),
    AddNetwork,
    RemoveAllNetworks,
    RemoveNetwork(u32),
    SetNetwork {
        id: u32,
        key: &'static str,
        value: NetworkValue,
    },
    GetNetwork {
        id: i32,
        key: &'static str,
    },
    SaveConfig,
    EnableNetwork(u32),
    Reassociate,
    WpsPbc(String),
    CtrlResponse {
        field: AuthField,
        network_id: i32,
        value: String,
    },
}

impl Command {
    /// Wire form with secrets masked, for logs and error messages
    pub fn redacted(&self) -> String {
        match self {
            Command::SetNetwork { id, key, .. } if matches!(*key, "psk" | "password") => {
                format!("SET_NETWORK {id} {key} <redacted>")
            }
            Command::CtrlResponse {
                field, network_id, ..
            } => format!("CTRL-RSP-{field}-{network_id}:<redacted>"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Status => f.write_str("STATUS"),
            Command::SignalPoll => f.write_str("SIGNAL_POLL"),
            Command::Scan => f.write_str("SCAN"),
            Command::Bss(index) => write!(f, "BSS {index}"),
            Command::AddNetwork => f.write_str("ADD_NETWORK"),
            Command::RemoveAllNetworks => f.write_str("REMOVE_NETWORK all"),
            Command::RemoveNetwork(id) => write!(f, "REMOVE_NETWORK {id}"),
            Command::SetNetwork { id, key, value } => write!(f, "SET_NETWORK {id} {key} {value}"),
            Command::GetNetwork { id, key } => write!(f, "GET_NETWORK {id} {key}"),
            Command::SaveConfig => f.write_str("SAVE_CONFIG"),
            Command::EnableNetwork(id) => write!(f, "ENABLE_NETWORK {id}"),
            Command::Reassociate => f.write_str("REASSOCIATE"),
            Command::WpsPbc(bssid) => write!(f, "WPS_PBC {bssid}"),
            Command::CtrlResponse {
                field,
                network_id,
                value,
            } => write!(f, "CTRL-RSP-{field}-{network_id}:{value}"),
        }
    }
}

/// Iterates the `key=value` lines of a response body, skipping anything else
fn key_values(body: &str) -> impl Iterator<Item = (&str, &str)> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
}

/// Parses the leading (optionally signed) integer of `s`
fn leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

/// Decoded `STATUS` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub bssid: String,
    pub ssid: String,
    pub ip_address: String,
    pub mac_address: String,
}

impl StatusReport {
    pub fn parse(body: &str) -> Self {
        let mut report = StatusReport::default();
        for (key, value) in key_values(body) {
            match key {
                "bssid" => report.bssid = value.to_string(),
                "ssid" => report.ssid = value.to_string(),
                "ip_address" => report.ip_address = value.to_string(),
                "address" => report.mac_address = value.to_string(),
                _ => {}
            }
        }
        report
    }

    /// Associated iff the daemon reports a non-blank bssid
    pub fn connected(&self) -> bool {
        !self.bssid.trim().is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bssid={}", self.bssid)?;
        writeln!(f, "ssid={}", self.ssid)?;
        writeln!(f, "ip_address={}", self.ip_address)?;
        writeln!(f, "address={}", self.mac_address)
    }
}

/// Decoded `BSS <index>` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BssRecord {
    pub bssid: String,
    pub id: Option<i32>,
    pub level: i32,
    pub flags: String,
    pub ssid: String,
    pub wps_device_name: Option<String>,
    pub wps_primary_device_type: Option<String>,
}

impl BssRecord {
    /// Returns `None` for an empty body, which ends the enumeration
    pub fn parse(body: &str) -> Option<Self> {
        if body.trim().is_empty() {
            return None;
        }

        let mut record = BssRecord {
            bssid: String::new(),
            id: None,
            level: UNKNOWN_SIGNAL_LEVEL,
            flags: String::new(),
            ssid: String::new(),
            wps_device_name: None,
            wps_primary_device_type: None,
        };

        for (key, value) in key_values(body) {
            match key {
                "bssid" => record.bssid = value.to_string(),
                "id" => record.id = value.trim().parse().ok(),
                "level" => record.level = leading_int(value).unwrap_or(UNKNOWN_SIGNAL_LEVEL),
                "flags" => record.flags = value.to_string(),
                "ssid" => record.ssid = value.to_string(),
                "wps_device_name" => record.wps_device_name = Some(value.to_string()),
                "wps_primary_device_type" => {
                    record.wps_primary_device_type = Some(value.to_string())
                }
                _ => {}
            }
        }

        Some(record)
    }

    pub fn wps_available(&self) -> bool {
        self.flags.contains("[WPS")
    }
}

/// Extracts the signal level from a `SIGNAL_POLL` response
///
/// The averaged value is preferred; a missing measurement yields
/// [`UNKNOWN_SIGNAL_LEVEL`].
pub fn parse_signal(body: &str) -> i32 {
    const AVG_RSSI: &str = "AVG_RSSI=";
    const RSSI: &str = "RSSI=";

    let value = if let Some(pos) = body.find(AVG_RSSI) {
        leading_int(&body[pos + AVG_RSSI.len()..])
    } else if let Some(pos) = body.find(RSSI) {
        leading_int(&body[pos + RSSI.len()..])
    } else {
        None
    };

    value.unwrap_or(UNKNOWN_SIGNAL_LEVEL)
}

/// Derives the authentication kind from a BSS flags string
///
/// EAP is tested before PSK and WPA2 before WPA so mixed-mode access points
/// classify as the strongest scheme they offer.
pub fn authentication_from_flags(flags: &str) -> AuthenticationKind {
    let kind = if flags.contains("[WPA2-EAP") {
        AuthenticationKind::Wpa2Eap
    } else if flags.contains("[WPA-EAP") {
        AuthenticationKind::WpaEap
    } else if flags.contains("[WPA2-PSK") {
        AuthenticationKind::Wpa2Psk
    } else if flags.contains("[WPA-PSK") {
        AuthenticationKind::WpaPsk
    } else {
        AuthenticationKind::NoneOpen
    };

    if kind == AuthenticationKind::NoneOpen && flags.contains("WEP") {
        AuthenticationKind::NoneWep
    } else {
        kind
    }
}

/// Applies the `GET_NETWORK <id> auth_alg` answer to a WEP classification
pub fn refine_wep(kind: AuthenticationKind, auth_alg: &str) -> AuthenticationKind {
    if kind == AuthenticationKind::NoneWep && auth_alg.trim() == "SHARED" {
        AuthenticationKind::NoneWepShared
    } else {
        kind
    }
}

/// Parses the network id returned by `ADD_NETWORK`
pub fn parse_network_id(body: &str) -> WifiResult<u32> {
    body.trim()
        .parse()
        .map_err(|_| WifiError::Protocol(format!("invalid network id: {:?}", body.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::Status.to_string(), "STATUS");
        assert_eq!(Command::Bss(3).to_string(), "BSS 3");
        assert_eq!(
            Command::RemoveAllNetworks.to_string(),
            "REMOVE_NETWORK all"
        );
        assert_eq!(
            Command::SetNetwork {
                id: 1,
                key: "psk",
                value: NetworkValue::psk("secret"),
            }
            .to_string(),
            "SET_NETWORK 1 psk \"secret\""
        );
        assert_eq!(
            Command::GetNetwork {
                id: 2,
                key: "auth_alg"
            }
            .to_string(),
            "GET_NETWORK 2 auth_alg"
        );
        assert_eq!(
            Command::CtrlResponse {
                field: AuthField::Otp,
                network_id: 2,
                value: "1234".into(),
            }
            .to_string(),
            "CTRL-RSP-OTP-2:1234"
        );
    }

    #[test]
    fn test_command_redaction() {
        let cmd = Command::SetNetwork {
            id: 0,
            key: "psk",
            value: NetworkValue::psk("password123"),
        };
        assert_eq!(cmd.redacted(), "SET_NETWORK 0 psk <redacted>");

        let cmd = Command::CtrlResponse {
            field: AuthField::Password,
            network_id: 1,
            value: "secret".into(),
        };
        assert!(!cmd.redacted().contains("secret"));
        assert_eq!(Command::Scan.redacted(), "SCAN");
    }

    #[test]
    fn test_psk_quoting() {
        assert_eq!(
            NetworkValue::psk("password123"),
            NetworkValue::Quoted("password123".into())
        );

        let hashed = "0123456789abcdef0123456789ABCDEF0123456789abcdef0123456789abcdef";
        assert_eq!(NetworkValue::psk(hashed), NetworkValue::Raw(hashed.into()));

        // 64 characters, but not all hex
        let not_hex = "z".repeat(64);
        assert_eq!(
            NetworkValue::psk(&not_hex),
            NetworkValue::Quoted(not_hex.clone())
        );
    }

    #[test]
    fn test_ssid_with_quote_is_hex_encoded() {
        assert_eq!(NetworkValue::ssid("home").to_string(), "\"home\"");
        assert_eq!(NetworkValue::ssid("a\"b").to_string(), "612262");
    }

    #[test]
    fn test_is_failure() {
        assert!(is_failure("FAIL\n"));
        assert!(is_failure("FAIL-BUSY\n"));
        assert!(is_failure("UNKNOWN COMMAND\n"));
        assert!(!is_failure("OK\n"));
        assert!(!is_failure(""));
    }

    #[test]
    fn test_parse_status() {
        let body = "bssid=01:02:03:04:05:06\nfreq=2412\nssid=home\nid=0\nmode=station\n\
                    wpa_state=COMPLETED\nip_address=192.168.1.20\naddress=aa:bb:cc:dd:ee:ff\n";
        let report = StatusReport::parse(body);

        assert_eq!(
            report,
            StatusReport {
                bssid: "01:02:03:04:05:06".into(),
                ssid: "home".into(),
                ip_address: "192.168.1.20".into(),
                mac_address: "aa:bb:cc:dd:ee:ff".into(),
            }
        );
        assert!(report.connected());
    }

    #[test]
    fn test_status_round_trip() {
        let report = StatusReport {
            bssid: "01:02:03:04:05:06".into(),
            ssid: "office=2".into(),
            ip_address: "10.0.0.7".into(),
            mac_address: "aa:bb:cc:dd:ee:ff".into(),
        };
        assert_eq!(StatusReport::parse(&report.to_string()), report);
    }

    #[test]
    fn test_status_connected_requires_bssid() {
        assert!(!StatusReport::parse("wpa_state=DISCONNECTED\naddress=aa:bb:cc:dd:ee:ff\n").connected());
        assert!(!StatusReport::parse("bssid=\n").connected());
        assert!(!StatusReport::parse("bssid=   \n").connected());
        assert!(StatusReport::parse("bssid=01:02:03:04:05:06\n").connected());
    }

    #[test]
    fn test_parse_status_ignores_unknown_and_malformed_lines() {
        let report = StatusReport::parse("garbage\n=novalue\nfuture_key=1\r\nssid=cafe\r\n");
        assert_eq!(report.ssid, "cafe");
        assert!(report.bssid.is_empty());
    }

    #[test]
    fn test_parse_signal_prefers_average() {
        let body = "RSSI=-60\nLINKSPEED=65\nNOISE=9999\nFREQUENCY=2412\nAVG_RSSI=-58\n";
        assert_eq!(parse_signal(body), -58);
    }

    #[test]
    fn test_parse_signal_falls_back() {
        assert_eq!(parse_signal("RSSI=-71\nLINKSPEED=65\n"), -71);
        assert_eq!(parse_signal("LINKSPEED=65\n"), UNKNOWN_SIGNAL_LEVEL);
        assert_eq!(parse_signal(""), UNKNOWN_SIGNAL_LEVEL);
        assert_eq!(parse_signal("RSSI=garbage\n"), UNKNOWN_SIGNAL_LEVEL);
    }

    #[test]
    fn test_parse_bss() {
        let body = "id=7\nbssid=aa:bb:cc:dd:ee:ff\nfreq=2437\nbeacon_int=100\nlevel=-48\n\
                    flags=[WPA2-PSK-CCMP][WPS][ESS]\nssid=home\nwps_device_name=Router\n\
                    wps_primary_device_type=6-0050F204-1\n";
        let record = BssRecord::parse(body).unwrap();

        assert_eq!(record.id, Some(7));
        assert_eq!(record.bssid, "aa:bb:cc:dd:ee:ff");
        assert_eq!(record.level, -48);
        assert_eq!(record.ssid, "home");
        assert_eq!(record.wps_device_name.as_deref(), Some("Router"));
        assert_eq!(
            record.wps_primary_device_type.as_deref(),
            Some("6-0050F204-1")
        );
        assert!(record.wps_available());
    }

    #[test]
    fn test_parse_bss_empty_body() {
        assert!(BssRecord::parse("").is_none());
        assert!(BssRecord::parse("\n").is_none());
    }

    #[test]
    fn test_parse_bss_defaults() {
        let record = BssRecord::parse("bssid=aa:bb:cc:dd:ee:ff\nflags=[ESS]\n").unwrap();
        assert_eq!(record.level, UNKNOWN_SIGNAL_LEVEL);
        assert_eq!(record.id, None);
        assert!(record.ssid.is_empty());
        assert!(!record.wps_available());
    }

    #[test]
    fn test_authentication_order() {
        assert_eq!(
            authentication_from_flags("[WPA-PSK-CCMP+TKIP][WPA2-PSK-CCMP+TKIP][ESS]"),
            AuthenticationKind::Wpa2Psk
        );
        assert_eq!(
            authentication_from_flags("[WPA2-PSK-CCMP][WPA2-EAP-CCMP][ESS]"),
            AuthenticationKind::Wpa2Eap
        );
        assert_eq!(
            authentication_from_flags("[WPA-EAP-TKIP][WPA2-PSK-CCMP]"),
            AuthenticationKind::WpaEap
        );
        assert_eq!(
            authentication_from_flags("[WPA-PSK-TKIP][ESS]"),
            AuthenticationKind::WpaPsk
        );
        assert_eq!(authentication_from_flags("[WEP][ESS]"), AuthenticationKind::NoneWep);
        assert_eq!(authentication_from_flags("[ESS]"), AuthenticationKind::NoneOpen);
        assert_eq!(authentication_from_flags(""), AuthenticationKind::NoneOpen);
    }

    #[test]
    fn test_refine_wep() {
        assert_eq!(
            refine_wep(AuthenticationKind::NoneWep, "SHARED\n"),
            AuthenticationKind::NoneWepShared
        );
        assert_eq!(
            refine_wep(AuthenticationKind::NoneWep, "OPEN"),
            AuthenticationKind::NoneWep
        );
        assert_eq!(
            refine_wep(AuthenticationKind::Wpa2Psk, "SHARED"),
            AuthenticationKind::Wpa2Psk
        );
    }

    #[test]
    fn test_parse_network_id() {
        assert_eq!(parse_network_id("3\n").unwrap(), 3);
        assert!(matches!(
            parse_network_id("OK\n"),
            Err(WifiError::Protocol(_))
        ));
    }
}
