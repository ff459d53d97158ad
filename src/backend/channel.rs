//! Control channel trait definition

use trait_variant::make;

use crate::core::error::WifiResult;

/// Default upper bound for a single response or event datagram
///
/// Scan and BSS queries need at least 2048 bytes.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 4096;

/// Abstraction over the daemon's local control interface
///
/// The channel carries two independent streams: command/response exchanges
/// and unsolicited event messages. Callers must not run two `request`s at
/// once; [`RequestSerializer`](crate::backend::RequestSerializer) enforces
/// that. The event stream is drained by a single reader.
#[make(Send)]
pub trait ControlChannel: Send + Sync + 'static {
    /// Writes `command` and waits for its reply
    ///
    /// Returns the raw response text. Failure markers are not interpreted
    /// here.
    async fn request(&self, command: &str) -> WifiResult<String>;

    /// Resolves once at least one event may be pending
    ///
    /// Readiness can be spurious; the caller drains with
    /// [`try_recv_event`](Self::try_recv_event) until it returns `None`.
    async fn readable(&self) -> WifiResult<()>;

    /// Takes one queued event message without waiting
    fn try_recv_event(&self) -> WifiResult<Option<String>>;

    /// Detaches from the event stream and closes the channel
    ///
    /// Idempotent.
    async fn close(&self);
}
