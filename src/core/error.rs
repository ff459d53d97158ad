//! Error types for the wpa_supplicant driver

use std::time::Duration;

use thiserror::Error;

use super::types::JoinStep;

/// Result type for driver and control channel operations
pub type WifiResult<T> = Result<T, WifiError>;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors related to the control channel and the operations built on it
#[derive(Error, Debug)]
pub enum WifiError {
    #[error("Control channel unavailable at {path}: {reason}")]
    ChannelUnavailable { path: String, reason: String },

    #[error("Request failed: {command}")]
    RequestFailed { command: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Join failed at step {step}: {source}")]
    PartialJoinFailure {
        step: JoinStep,
        #[source]
        source: Box<WifiError>,
    },

    #[error("Request timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl WifiError {
    pub fn channel_unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ChannelUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps `self` as the cause of a failed join step
    pub fn at_join_step(self, step: JoinStep) -> Self {
        Self::PartialJoinFailure {
            step,
            source: Box::new(self),
        }
    }
}

/// Errors related to the JSON-RPC control socket
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid message format")]
    InvalidMessageFormat,

    #[error("Message is not valid UTF-8")]
    InvalidEncoding,
}
