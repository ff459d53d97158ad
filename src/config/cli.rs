//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(name = "wpa-ctrl-driver", version, author)]
#[clap(about = "wpa_supplicant control interface driver with a JSON-RPC control socket")]
pub struct CliArgs {
    /// Wireless network interface name
    #[clap(short, long, default_value = "wlan0")]
    pub interface: String,

    /// wpa_supplicant control socket [default: /var/run/wpa_supplicant/<interface>]
    #[clap(long)]
    pub ctrl_path: Option<String>,

    /// Command that starts wpa_supplicant [default: systemctl start wpa_supplicant@<interface>.service]
    #[clap(long)]
    pub wifi_on_cmd: Option<String>,

    /// Command that stops wpa_supplicant [default: systemctl stop wpa_supplicant@<interface>.service]
    #[clap(long)]
    pub wifi_off_cmd: Option<String>,

    /// Never launch the on/off commands
    #[clap(long)]
    pub no_power_control: bool,

    /// Status and signal poll period in milliseconds
    #[clap(long, default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// Disable periodic status polling
    #[clap(long)]
    pub no_status_polling: bool,

    /// Disable periodic signal strength polling
    #[clap(long)]
    pub no_signal_polling: bool,

    /// Seconds after which a scan without results is reported as failed
    #[clap(long, default_value_t = 10)]
    pub scan_timeout_secs: u64,

    /// Maximum wait for a single control interface response in milliseconds
    #[clap(long, default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Upper bound of enumerated scan results
    #[clap(long, default_value_t = 100)]
    pub max_scan_results: usize,

    /// Enable Unix socket transport
    #[clap(long)]
    pub enable_unix_socket: bool,

    /// Path for Unix socket
    #[clap(long, default_value = "/run/wpa-ctrl-driver.sock")]
    pub socket_path: String,

    /// Socket file permissions (octal, e.g., 660)
    #[clap(long, default_value = "660")]
    pub socket_mode: String,
}
