//! Unix socket session management

use serde::Serialize;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader},
    net::unix::{OwnedReadHalf, OwnedWriteHalf},
    sync::Mutex,
};

use crate::{
    core::{
        error::{TransportError, TransportResult},
        types::SessionId,
    },
    protocol::{JsonRpcNotification, JsonRpcResponse},
};

/// Longest request line a client may send
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Write side of a control socket client
///
/// Clones share the writer, so responses and notifications written from
/// different tasks never interleave within a line.
#[derive(Debug, Clone)]
pub struct UnixSocketSession {
    id: SessionId,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl UnixSocketSession {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            id: SessionId::new(),
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn send_response(&self, response: &JsonRpcResponse) -> TransportResult<()> {
        self.send_line(response).await
    }

    pub async fn send_notification(
        &self,
        notification: &JsonRpcNotification,
    ) -> TransportResult<()> {
        self.send_line(notification).await
    }

    async fn send_line<T: Serialize>(&self, message: &T) -> TransportResult<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;

        Ok(())
    }
}

/// Line reader for a client's requests
pub struct SessionReader<R = OwnedReadHalf> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> SessionReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Reads the next line without its terminator; `None` at end of stream
    ///
    /// Lines longer than [`MAX_LINE_LENGTH`] fail with
    /// [`TransportError::InvalidMessageFormat`]. A line that is not UTF-8
    /// is consumed and fails with [`TransportError::InvalidEncoding`]; the
    /// stream stays usable.
    pub async fn read_line(&mut self) -> TransportResult<Option<String>> {
        let mut line = Vec::new();
        let bytes_read = (&mut self.reader)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if !line.ends_with(b"\n") && bytes_read > MAX_LINE_LENGTH {
            return Err(TransportError::InvalidMessageFormat);
        }

        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }

        String::from_utf8(line)
            .map(Some)
            .map_err(|_| TransportError::InvalidEncoding)
    }
}
