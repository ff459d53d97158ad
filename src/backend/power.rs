//! Radio power capability
//!
//! The driver switches the daemon on and off through this interface. The
//! target platform launches configured shell commands; other platforms use
//! [`NoopPowerControl`].

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Start/stop side effects for the network daemon
///
/// Both operations are best-effort: the driver does not observe their
/// outcome.
pub trait PowerControl: Send + Sync + 'static {
    fn wifi_on(&self);
    fn wifi_off(&self);
}

impl<T: PowerControl + ?Sized> PowerControl for Box<T> {
    fn wifi_on(&self) {
        (**self).wifi_on();
    }

    fn wifi_off(&self) {
        (**self).wifi_off();
    }
}

/// Runs externally configured shell commands, e.g.
/// `systemctl start wpa_supplicant@wlan0.service`
#[derive(Debug, Clone)]
pub struct ShellPowerControl {
    on_command: String,
    off_command: String,
}

impl ShellPowerControl {
    pub fn new(on_command: impl Into<String>, off_command: impl Into<String>) -> Self {
        Self {
            on_command: on_command.into(),
            off_command: off_command.into(),
        }
    }

    fn launch(&self, command_line: &str) {
        info!("Launching: {}", command_line);

        match Command::new("sh").arg("-c").arg(command_line).spawn() {
            Ok(mut child) => {
                let command_line = command_line.to_string();
                // reap the child so it does not linger as a zombie
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) => debug!("`{}` exited with {}", command_line, status),
                        Err(e) => warn!("Failed to wait for `{}`: {}", command_line, e),
                    }
                });
            }
            Err(e) => warn!("Failed to launch `{}`: {}", command_line, e),
        }
    }
}

impl PowerControl for ShellPowerControl {
    fn wifi_on(&self) {
        self.launch(&self.on_command);
    }

    fn wifi_off(&self) {
        self.launch(&self.off_command);
    }
}

/// Power control for platforms where the daemon is managed elsewhere
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPowerControl;

impl PowerControl for NoopPowerControl {
    fn wifi_on(&self) {
        debug!("wifi on: no power control configured");
    }

    fn wifi_off(&self) {
        debug!("wifi off: no power control configured");
    }
}
