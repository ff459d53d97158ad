//! Mock control channel for testing

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

use crate::{
    backend::ControlChannel,
    core::error::{WifiError, WifiResult},
};

const DEFAULT_RESPONSE: &str = "OK\n";

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    IoError,
    Hang,
}

/// Internal state for the mock channel
#[derive(Debug, Default)]
struct MockState {
    sticky: HashMap<String, Reply>,
    queued: HashMap<String, VecDeque<Reply>>,
    commands: Vec<String>,
    events: VecDeque<String>,
    current: Option<String>,
    delay: Option<Duration>,
    closed: bool,
}

#[derive(Debug, Default)]
struct MockInner {
    state: Mutex<MockState>,
    events_ready: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Scripted stand-in for the daemon
///
/// Unscripted commands answer `OK`. Every request is recorded, and the
/// number of overlapping requests is tracked so tests can assert that
/// exchanges never interleave.
#[derive(Debug, Clone, Default)]
pub struct MockControlChannel {
    inner: Arc<MockInner>,
}

impl MockControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the state from the others
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer every `command` with `response`
    pub fn respond(&self, command: &str, response: &str) {
        self.state()
            .sticky
            .insert(command.to_string(), Reply::Text(response.to_string()));
    }

    /// Answer the next `command` with `response`, ahead of any sticky reply
    pub fn respond_once(&self, command: &str, response: &str) {
        self.state()
            .queued
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Text(response.to_string()));
    }

    /// Answer every `command` with the daemon's failure marker
    pub fn fail_on(&self, command: &str) {
        self.respond(command, "FAIL\n");
    }

    /// Make every `command` fail at the transport level
    pub fn io_error_on(&self, command: &str) {
        self.state()
            .sticky
            .insert(command.to_string(), Reply::IoError);
    }

    /// Never answer `command`
    pub fn hang_on(&self, command: &str) {
        self.state().sticky.insert(command.to_string(), Reply::Hang);
    }

    /// Delay each reply, widening the window for interleaved requests
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// Queue an unsolicited message and signal readiness
    pub fn push_event(&self, message: &str) {
        self.state().events.push_back(message.to_string());
        self.inner.events_ready.notify_one();
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Highest number of requests observed in flight at the same time
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn closed_error() -> WifiError {
        WifiError::channel_unavailable("mock", "channel closed")
    }
}

impl ControlChannel for MockControlChannel {
    async fn request(&self, command: &str) -> WifiResult<String> {
        let delay = {
            let mut state = self.state();
            if state.closed {
                return Err(Self::closed_error());
            }
            state.commands.push(command.to_string());
            state.current = Some(command.to_string());
            state.delay
        };

        let in_flight = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        // Answer whatever was written last, like a shared socket would if two
        // callers interleaved their writes.
        let reply = {
            let mut state = self.state();
            let current = state.current.clone().unwrap_or_default();
            match state.queued.get_mut(&current).and_then(VecDeque::pop_front) {
                Some(reply) => reply,
                None => state
                    .sticky
                    .get(&current)
                    .cloned()
                    .unwrap_or_else(|| Reply::Text(DEFAULT_RESPONSE.to_string())),
            }
        };

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::IoError => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock transport failure",
            )
            .into()),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn readable(&self) -> WifiResult<()> {
        loop {
            {
                let state = self.state();
                if state.closed {
                    return Err(Self::closed_error());
                }
                if !state.events.is_empty() {
                    return Ok(());
                }
            }
            self.inner.events_ready.notified().await;
        }
    }

    fn try_recv_event(&self) -> WifiResult<Option<String>> {
        let mut state = self.state();
        if state.closed {
            return Err(Self::closed_error());
        }
        Ok(state.events.pop_front())
    }

    async fn close(&self) {
        self.state().closed = true;
        self.inner.events_ready.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scripted_responses() {
        let channel = MockControlChannel::new();
        channel.respond("STATUS", "bssid=aa\n");
        channel.respond_once("STATUS", "bssid=\n");

        assert_eq!(channel.request("STATUS").await.unwrap(), "bssid=\n");
        assert_eq!(channel.request("STATUS").await.unwrap(), "bssid=aa\n");
        assert_eq!(channel.request("SCAN").await.unwrap(), "OK\n");
        assert_eq!(channel.commands(), vec!["STATUS", "STATUS", "SCAN"]);
    }

    #[tokio::test]
    async fn test_mock_io_error() {
        let channel = MockControlChannel::new();
        channel.io_error_on("SCAN");
        assert!(matches!(
            channel.request("SCAN").await,
            Err(WifiError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_events() {
        let channel = MockControlChannel::new();
        assert!(channel.try_recv_event().unwrap().is_none());

        channel.push_event("<3>CTRL-EVENT-CONNECTED");
        channel.readable().await.unwrap();
        assert_eq!(
            channel.try_recv_event().unwrap().as_deref(),
            Some("<3>CTRL-EVENT-CONNECTED")
        );
    }

    #[tokio::test]
    async fn test_mock_close() {
        let channel = MockControlChannel::new();
        channel.close().await;
        assert!(channel.is_closed());
        assert!(channel.request("PING").await.is_err());
        assert!(channel.readable().await.is_err());
    }
}
