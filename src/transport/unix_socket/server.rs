//! Unix socket server implementation

use std::{os::unix::fs::PermissionsExt, path::Path, sync::Arc};
use tokio::{
    fs,
    net::{UnixListener, UnixStream},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, error, info, warn};

use crate::{
    backend::{ControlChannel, PowerControl},
    core::{
        driver::WifiDriver,
        error::{TransportError, TransportResult},
    },
    protocol::{JsonRpcError, JsonRpcNotification, JsonRpcResponse, Notification, RequestId},
    transport::unix_socket::{
        handler::RequestHandler,
        session::{SessionReader, UnixSocketSession},
    },
};

/// Line-delimited JSON-RPC server on a Unix stream socket
///
/// Every client can issue requests and receives all driver notifications.
pub struct UnixSocketServer<C: ControlChannel, P: PowerControl> {
    listener: UnixListener,
    driver: Arc<WifiDriver<C, P>>,
    handler: Arc<RequestHandler<C, P>>,
}

impl<C: ControlChannel, P: PowerControl> UnixSocketServer<C, P> {
    /// Binds `socket_path`, replacing a stale socket file, and applies `mode`
    pub async fn bind(
        socket_path: impl AsRef<Path>,
        mode: u32,
        driver: Arc<WifiDriver<C, P>>,
    ) -> TransportResult<Self> {
        let socket_path = socket_path.as_ref();

        if fs::try_exists(socket_path).await.unwrap_or(false) {
            fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        fs::set_permissions(socket_path, std::fs::Permissions::from_mode(mode)).await?;
        info!(
            "Unix socket server listening on {} (mode {:o})",
            socket_path.display(),
            mode
        );

        Ok(Self::from_listener(listener, driver))
    }

    /// Serves on an already bound listener, e.g. one passed by the service manager
    pub fn from_listener(listener: UnixListener, driver: Arc<WifiDriver<C, P>>) -> Self {
        let handler = Arc::new(RequestHandler::new(driver.clone()));
        Self {
            listener,
            driver,
            handler,
        }
    }

    /// Accepts clients until the task is cancelled
    pub async fn run(self) -> TransportResult<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let handler = self.handler.clone();
                    let notifications = self.driver.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_client(stream, handler, notifications).await {
                            error!("Error handling client: {}", e);
                        }
                    });
                }
                Err(e) => {
                    warn!("Error accepting connection: {}", e);
                }
            }
        }
    }

    async fn handle_client(
        stream: UnixStream,
        handler: Arc<RequestHandler<C, P>>,
        notifications: broadcast::Receiver<Notification>,
    ) -> TransportResult<()> {
        let (read_half, write_half) = stream.into_split();
        let session = UnixSocketSession::new(write_half);
        let reader = SessionReader::new(read_half);

        info!("New client connected: {}", session.id());

        let forwarder = tokio::spawn(Self::forward_notifications(
            session.clone(),
            notifications,
        ));
        let result = Self::serve_requests(&session, reader, &handler).await;
        forwarder.abort();

        info!("Client disconnected: {}", session.id());
        result
    }

    async fn serve_requests(
        session: &UnixSocketSession,
        mut reader: SessionReader,
        handler: &RequestHandler<C, P>,
    ) -> TransportResult<()> {
        loop {
            let line = match reader.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(()),
                Err(TransportError::InvalidMessageFormat) => {
                    warn!("Request line too long, closing session {}", session.id());
                    let response = JsonRpcResponse::error(
                        JsonRpcError::invalid_request("request too long"),
                        RequestId::Null,
                    );
                    return session.send_response(&response).await;
                }
                Err(TransportError::InvalidEncoding) => {
                    debug!("Request line is not UTF-8 on session {}", session.id());
                    let response = JsonRpcResponse::error(
                        JsonRpcError::parse_error(),
                        RequestId::Null,
                    );
                    session.send_response(&response).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if line.trim().is_empty() {
                continue;
            }

            let response = handler.handle_line(&line).await;
            session.send_response(&response).await?;
        }
    }

    async fn forward_notifications(
        session: UnixSocketSession,
        mut notifications: broadcast::Receiver<Notification>,
    ) {
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    let message = JsonRpcNotification::new(notification);
                    if let Err(e) = session.send_notification(&message).await {
                        debug!("Stopped notifying {}: {}", session.id(), e);
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session {} missed {} notifications", session.id(), skipped);
                }
                Err(RecvError::Closed) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{MockControlChannel, NoopPowerControl},
        core::driver::DriverOptions,
        protocol::{JsonRpcRequest, Request, Response},
    };
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    type TestDriver = WifiDriver<MockControlChannel, NoopPowerControl>;

    fn driver(channel: &MockControlChannel) -> Arc<TestDriver> {
        Arc::new(WifiDriver::new(
            Arc::new(channel.clone()),
            NoopPowerControl,
            DriverOptions::default(),
        ))
    }

    async fn connect(path: &Path) -> (SessionReader, tokio::net::unix::OwnedWriteHalf) {
        let client = UnixStream::connect(path).await.unwrap();
        let (read_half, write_half) = client.into_split();
        (SessionReader::new(read_half), write_half)
    }

    async fn read_line(reader: &mut SessionReader) -> String {
        tokio::time::timeout(std::time::Duration::from_secs(2), reader.read_line())
            .await
            .expect("no message from server")
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket_and_sets_mode() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("driver.sock");
        std::fs::write(&socket_path, b"stale").unwrap();

        let channel = MockControlChannel::new();
        let _server = UnixSocketServer::bind(&socket_path, 0o600, driver(&channel))
            .await
            .unwrap();

        let mode = std::fs::metadata(&socket_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_request_and_notifications() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("driver.sock");

        let channel = MockControlChannel::new();
        let driver = driver(&channel);
        let server = UnixSocketServer::bind(&socket_path, 0o660, driver.clone())
            .await
            .unwrap();
        tokio::spawn(server.run());

        let (mut reader, mut writer) = connect(&socket_path).await;
        let (mut other_reader, mut other_writer) = connect(&socket_path).await;

        // a served request proves the session is subscribed
        for (id, reader, writer) in [
            (1, &mut reader, &mut writer),
            (2, &mut other_reader, &mut other_writer),
        ] {
            let request = JsonRpcRequest::new(Request::TurnOff, RequestId::Number(id));
            let mut line = serde_json::to_vec(&request).unwrap();
            line.push(b'\n');
            writer.write_all(&line).await.unwrap();

            let response: JsonRpcResponse =
                serde_json::from_str(&read_line(reader).await).unwrap();
            assert_eq!(response.id, RequestId::Number(id));
            assert!(matches!(response.result, Some(Response::Ok(_))));
        }

        // both clients see driver notifications
        driver.handle_message("<3>CTRL-EVENT-CONNECTED").await;
        for reader in [&mut reader, &mut other_reader] {
            let notification: JsonRpcNotification =
                serde_json::from_str(&read_line(reader).await).unwrap();
            assert_eq!(notification.notification, Notification::connection(true));
        }
    }

    #[tokio::test]
    async fn test_invalid_line_gets_parse_error() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("driver.sock");

        let channel = MockControlChannel::new();
        let server = UnixSocketServer::bind(&socket_path, 0o660, driver(&channel))
            .await
            .unwrap();
        tokio::spawn(server.run());

        let (mut reader, mut writer) = connect(&socket_path).await;
        writer.write_all(b"\n{garbage\n").await.unwrap();

        let response: JsonRpcResponse = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_non_utf8_line_keeps_session_open() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("driver.sock");

        let channel = MockControlChannel::new();
        let server = UnixSocketServer::bind(&socket_path, 0o660, driver(&channel))
            .await
            .unwrap();
        tokio::spawn(server.run());

        let (mut reader, mut writer) = connect(&socket_path).await;
        writer.write_all(b"{\"id\":\xff}\n").await.unwrap();

        let response: JsonRpcResponse = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);

        let request = JsonRpcRequest::new(Request::TurnOff, RequestId::Number(9));
        let mut line = serde_json::to_vec(&request).unwrap();
        line.push(b'\n');
        writer.write_all(&line).await.unwrap();

        let response: JsonRpcResponse = serde_json::from_str(&read_line(&mut reader).await).unwrap();
        assert_eq!(response.id, RequestId::Number(9));
        assert!(matches!(response.result, Some(Response::Ok(_))));
    }
}
