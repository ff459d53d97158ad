//! wpa_supplicant control socket implementation

use std::{
    io,
    os::fd::{AsRawFd, RawFd},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::io::{Interest, unix::AsyncFd};
use tracing::{debug, info, warn};
use wpactrl::{Client, ClientAttached};

use crate::{
    backend::ControlChannel,
    core::error::{WifiError, WifiResult},
};

/// Raw descriptor of the attached monitor client
struct MonitorFd(RawFd);

impl AsRawFd for MonitorFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

enum Monitor {
    Attached(ClientAttached),
    // kept open until drop so the registered descriptor stays valid
    Detached(Client),
    Closed,
}

/// Control channel over the daemon's Unix datagram socket
///
/// Two `wpactrl` clients are connected to the daemon: one carries
/// command/response exchanges, the other is attached and receives the
/// unsolicited event stream, so draining events never competes with an
/// in-flight request.
pub struct WpaCtrlChannel {
    ctrl_path: PathBuf,
    // declared before `monitor` so it is deregistered first
    monitor_ready: AsyncFd<MonitorFd>,
    request: Arc<Mutex<Option<Client>>>,
    monitor: Arc<Mutex<Monitor>>,
    capacity: usize,
    closed: AtomicBool,
}

impl WpaCtrlChannel {
    /// Opens the control socket at `path` and attaches to its event stream
    ///
    /// `capacity` bounds every response and event message.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> WifiResult<Self> {
        let ctrl_path = path.as_ref().to_path_buf();
        let display = ctrl_path.display().to_string();

        if !ctrl_path.exists() {
            return Err(WifiError::channel_unavailable(
                display,
                "control socket not found",
            ));
        }

        let blocking_path = ctrl_path.clone();
        let (request, monitor) = tokio::task::spawn_blocking(move || {
            let request = Client::builder()
                .ctrl_path(&blocking_path)
                .open()
                .map_err(|e| format!("open failed: {}", e))?;
            let monitor = Client::builder()
                .ctrl_path(&blocking_path)
                .open()
                .map_err(|e| format!("open failed: {}", e))?
                .attach()
                .map_err(|e| format!("attach refused: {}", e))?;
            Ok::<_, String>((request, monitor))
        })
        .await
        .map_err(|e| WifiError::channel_unavailable(display.clone(), e))?
        .map_err(|reason| WifiError::channel_unavailable(display.clone(), reason))?;

        let monitor_ready =
            AsyncFd::with_interest(MonitorFd(monitor.as_raw_fd()), Interest::READABLE)
                .map_err(|e| WifiError::channel_unavailable(display, e))?;

        info!("Attached to control socket {}", ctrl_path.display());
        Ok(Self {
            ctrl_path,
            monitor_ready,
            request: Arc::new(Mutex::new(Some(request))),
            monitor: Arc::new(Mutex::new(Monitor::Attached(monitor))),
            capacity,
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the daemon's control socket
    pub fn path(&self) -> &Path {
        &self.ctrl_path
    }

    fn unavailable(&self, reason: &str) -> WifiError {
        WifiError::channel_unavailable(self.ctrl_path.display().to_string(), reason)
    }

    fn ensure_open(&self) -> WifiResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.unavailable("channel closed"));
        }
        Ok(())
    }

    fn check_capacity(&self, message: String, kind: &str) -> WifiResult<String> {
        if message.len() > self.capacity {
            return Err(WifiError::Protocol(format!(
                "{} exceeds {} bytes",
                kind, self.capacity
            )));
        }
        Ok(message)
    }
}

fn ctrl_error(e: wpactrl::Error) -> WifiError {
    WifiError::Io(io::Error::other(e.to_string()))
}

fn poisoned() -> WifiError {
    WifiError::Io(io::Error::other("control client lock poisoned"))
}

impl ControlChannel for WpaCtrlChannel {
    async fn request(&self, command: &str) -> WifiResult<String> {
        self.ensure_open()?;

        let client = self.request.clone();
        let command = command.to_string();
        // The lock is held for the whole exchange, so an abandoned
        // exchange still finishes before the next one is written.
        let response = tokio::task::spawn_blocking(move || {
            let mut guard = client.lock().map_err(|_| poisoned())?;
            match guard.as_mut() {
                Some(client) => client.request(&command).map_err(ctrl_error),
                None => Err(WifiError::Io(io::Error::from(io::ErrorKind::NotConnected))),
            }
        })
        .await
        .map_err(|e| WifiError::Io(io::Error::other(e)))??;

        self.check_capacity(response, "response")
    }

    async fn readable(&self) -> WifiResult<()> {
        self.ensure_open()?;
        let mut guard = self.monitor_ready.readable().await?;
        // the caller drains every queued event after this returns
        guard.clear_ready();
        Ok(())
    }

    fn try_recv_event(&self) -> WifiResult<Option<String>> {
        self.ensure_open()?;

        let mut monitor = self.monitor.lock().map_err(|_| poisoned())?;
        match &mut *monitor {
            Monitor::Attached(client) => match client.recv().map_err(ctrl_error)? {
                Some(event) => self.check_capacity(event, "event").map(Some),
                None => Ok(None),
            },
            _ => Err(self.unavailable("channel closed")),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let monitor = self.monitor.clone();
        let detach = tokio::task::spawn_blocking(move || {
            let Ok(mut guard) = monitor.lock() else {
                return;
            };
            if let Monitor::Attached(client) = std::mem::replace(&mut *guard, Monitor::Closed) {
                match client.detach() {
                    Ok(client) => {
                        debug!("Detached from event stream");
                        *guard = Monitor::Detached(client);
                    }
                    Err(e) => warn!("DETACH failed: {}", e),
                }
            }
        });
        if let Err(e) = detach.await {
            warn!("DETACH task failed: {}", e);
        }

        match self.request.lock() {
            Ok(mut client) => drop(client.take()),
            Err(_) => warn!("Request client lock poisoned"),
        }

        info!("Closed control socket {}", self.ctrl_path.display());
    }
}
