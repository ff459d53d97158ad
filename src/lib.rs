//! wpa_supplicant control interface driver
//!
//! Talks to the daemon over its local control socket, tracks connection
//! and scan state from unsolicited events and periodic polls, and exposes
//! the driver operations plus change notifications over a Unix socket
//! (JSON-RPC 2.0).

pub mod backend;
pub mod config;
pub mod core;
pub mod protocol;
pub mod transport;

pub use core::{
    driver::{DriverOptions, WifiDriver},
    error::{TransportError, WifiError, WifiResult},
    types::{AuthField, AuthenticationKind, ConnectionStatus, NetworkRecord, ScanStatus},
};
pub use protocol::Notification;
