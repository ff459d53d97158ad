//! Single in-flight request discipline for the shared control channel

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    backend::{
        ControlChannel,
        codec::{self, Command},
    },
    core::error::{WifiError, WifiResult},
};

/// Serializes command/response exchanges on a [`ControlChannel`]
///
/// Every exchange holds the lock from write until its response has been
/// read, so concurrent callers never interleave writes or receive each
/// other's responses. The event stream is not behind this lock.
pub struct RequestSerializer<C: ControlChannel> {
    channel: Arc<C>,
    lock: Mutex<()>,
    timeout: Duration,
}

impl<C: ControlChannel> RequestSerializer<C> {
    pub fn new(channel: Arc<C>, timeout: Duration) -> Self {
        Self {
            channel,
            lock: Mutex::new(()),
            timeout,
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    /// Sends `command` and returns the response body
    ///
    /// A response starting with the failure marker becomes
    /// [`WifiError::RequestFailed`].
    pub async fn send(&self, command: &Command) -> WifiResult<String> {
        let wire = command.to_string();
        let shown = command.redacted();

        let guard = self.lock.lock().await;
        let response = tokio::time::timeout(self.timeout, self.channel.request(&wire))
            .await
            .map_err(|_| WifiError::Timeout {
                command: shown.clone(),
                timeout: self.timeout,
            })??;
        drop(guard);

        debug!("{} response: {:?}", shown, response.trim_end());

        if codec::is_failure(&response) {
            return Err(WifiError::RequestFailed { command: shown });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockControlChannel;

    fn serializer(channel: &MockControlChannel) -> Arc<RequestSerializer<MockControlChannel>> {
        Arc::new(RequestSerializer::new(
            Arc::new(channel.clone()),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_send_ok() {
        let channel = MockControlChannel::new();
        channel.respond("STATUS", "bssid=aa\n");
        let serializer = serializer(&channel);

        assert_eq!(serializer.send(&Command::Status).await.unwrap(), "bssid=aa\n");
    }

    #[tokio::test]
    async fn test_send_failure_marker() {
        let channel = MockControlChannel::new();
        channel.fail_on("BSS 9");
        let serializer = serializer(&channel);

        match serializer.send(&Command::Bss(9)).await {
            Err(WifiError::RequestFailed { command }) => assert_eq!(command, "BSS 9"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_leak_secret() {
        let channel = MockControlChannel::new();
        channel.fail_on("SET_NETWORK 0 psk \"hunter22\"");
        let serializer = serializer(&channel);

        let err = serializer
            .send(&Command::SetNetwork {
                id: 0,
                key: "psk",
                value: codec::NetworkValue::psk("hunter22"),
            })
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("hunter22"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_timeout() {
        let channel = MockControlChannel::new();
        channel.hang_on("SCAN");
        let serializer = serializer(&channel);

        let result = serializer.send(&Command::Scan).await;
        assert!(matches!(result, Err(WifiError::Timeout { .. })));

        // the lock is released after a timeout
        assert!(serializer.send(&Command::Status).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_callers_receive_own_responses() {
        let channel = MockControlChannel::new();
        channel.set_delay(Duration::from_millis(5));
        for i in 0..8 {
            channel.respond(&format!("BSS {i}"), &format!("id={i}\n"));
        }
        let serializer = serializer(&channel);

        let tasks = (0..8).map(|i| {
            let serializer = serializer.clone();
            tokio::spawn(async move { (i, serializer.send(&Command::Bss(i)).await) })
        });

        for result in futures::future::join_all(tasks).await {
            let (i, response) = result.unwrap();
            assert_eq!(response.unwrap(), format!("id={i}\n"));
        }
        assert_eq!(channel.max_in_flight(), 1);
        assert_eq!(channel.commands().len(), 8);
    }
}
