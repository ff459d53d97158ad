//! Runtime settings

use std::{path::PathBuf, time::Duration};

use crate::{
    backend::DEFAULT_RESPONSE_CAPACITY, config::CliArgs, core::driver::DriverOptions,
};

const DEFAULT_SOCKET_MODE: u32 = 0o660;

/// Shell commands switching the daemon on and off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerCommands {
    pub on: String,
    pub off: String,
}

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub interface: String,
    pub ctrl_path: PathBuf,
    /// `None` selects the no-op power control
    pub power_commands: Option<PowerCommands>,
    pub driver: DriverOptions,
    pub enable_unix_socket: bool,
    pub socket_path: PathBuf,
    pub socket_mode: u32,
}

impl From<CliArgs> for Settings {
    fn from(args: CliArgs) -> Self {
        let interface = args.interface;

        // Parse octal socket mode
        let socket_mode =
            u32::from_str_radix(&args.socket_mode, 8).unwrap_or(DEFAULT_SOCKET_MODE);

        let ctrl_path = args
            .ctrl_path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("/var/run/wpa_supplicant/{interface}")));

        let power_commands = (!args.no_power_control).then(|| PowerCommands {
            on: args
                .wifi_on_cmd
                .unwrap_or_else(|| format!("systemctl start wpa_supplicant@{interface}.service")),
            off: args
                .wifi_off_cmd
                .unwrap_or_else(|| format!("systemctl stop wpa_supplicant@{interface}.service")),
        });

        let driver = DriverOptions {
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            status_polling: !args.no_status_polling,
            signal_polling: !args.no_signal_polling,
            scan_timeout: Duration::from_secs(args.scan_timeout_secs),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            max_scan_results: args.max_scan_results,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        };

        Settings {
            interface,
            ctrl_path,
            power_commands,
            driver,
            enable_unix_socket: args.enable_unix_socket,
            socket_path: PathBuf::from(args.socket_path),
            socket_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn settings(args: &[&str]) -> Settings {
        Settings::from(CliArgs::parse_from(
            std::iter::once("wpa-ctrl-driver").chain(args.iter().copied()),
        ))
    }

    #[test]
    fn test_defaults_derive_from_interface() {
        let settings = settings(&["--interface", "wlan1"]);

        assert_eq!(settings.ctrl_path, PathBuf::from("/var/run/wpa_supplicant/wlan1"));
        assert_eq!(
            settings.power_commands,
            Some(PowerCommands {
                on: "systemctl start wpa_supplicant@wlan1.service".into(),
                off: "systemctl stop wpa_supplicant@wlan1.service".into(),
            })
        );
        assert_eq!(settings.socket_mode, 0o660);
        assert_eq!(settings.driver.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.driver.scan_timeout, Duration::from_secs(10));
        assert!(settings.driver.status_polling);
    }

    #[test]
    fn test_explicit_values() {
        let settings = settings(&[
            "--ctrl-path",
            "/tmp/ctrl",
            "--wifi-on-cmd",
            "rfkill unblock wifi",
            "--socket-mode",
            "600",
            "--no-status-polling",
            "--request-timeout-ms",
            "250",
        ]);

        assert_eq!(settings.ctrl_path, PathBuf::from("/tmp/ctrl"));
        assert_eq!(
            settings.power_commands.map(|commands| commands.on),
            Some("rfkill unblock wifi".to_string())
        );
        assert_eq!(settings.socket_mode, 0o600);
        assert!(!settings.driver.status_polling);
        assert_eq!(settings.driver.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_no_power_control_and_bad_mode() {
        let settings = settings(&["--no-power-control", "--socket-mode", "9x"]);
        assert!(settings.power_commands.is_none());
        assert_eq!(settings.socket_mode, DEFAULT_SOCKET_MODE);
    }
}
