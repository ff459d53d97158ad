//! wpa_supplicant driver - Main Entry Point

use clap::Parser;
use tokio::net::UnixListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wpa_ctrl_driver::{
    backend::{NoopPowerControl, PowerControl, ShellPowerControl},
    config::{CliArgs, Settings},
    core::driver::WifiDriver,
    transport::unix_socket::UnixSocketServer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wpa_ctrl_driver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    info!(?args, "Starting wpa_supplicant driver");
    let settings = Settings::from(args);

    let power: Box<dyn PowerControl> = match &settings.power_commands {
        Some(commands) => Box::new(ShellPowerControl::new(&commands.on, &commands.off)),
        None => Box::new(NoopPowerControl),
    };

    let driver = match WifiDriver::init(&settings.ctrl_path, power, settings.driver.clone()).await
    {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to initialize driver for {}: {}", settings.interface, e);
            return Err(e.into());
        }
    };

    let mut tasks = Vec::new();

    if settings.enable_unix_socket {
        let server = match activated_listener()? {
            Some(listener) => {
                info!("Using socket-activated Unix socket");
                UnixSocketServer::from_listener(listener, driver.clone())
            }
            None => {
                info!("Starting Unix socket transport on {}", settings.socket_path.display());
                UnixSocketServer::bind(&settings.socket_path, settings.socket_mode, driver.clone())
                    .await?
            }
        };

        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Unix socket server error: {}", e);
            }
        }));
    }

    #[cfg(feature = "systemd")]
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        tracing::warn!("Failed to notify service manager: {}", e);
    }

    info!("Driver started for {}", settings.interface);

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully");
        }
        _ = shutdown_signal() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = async {
            if tasks.is_empty() {
                std::future::pending::<()>().await;
            }
            futures::future::join_all(tasks).await;
        } => {
            info!("All tasks completed");
        }
    }

    info!("Shutting down...");
    driver.shutdown().await;
    Ok(())
}

/// Listener passed by the service manager, if any
fn activated_listener() -> std::io::Result<Option<UnixListener>> {
    let mut fds = listenfd::ListenFd::from_env();
    match fds.take_unix_listener(0)? {
        Some(listener) => {
            listener.set_nonblocking(true)?;
            Ok(Some(UnixListener::from_std(listener)?))
        }
        None => Ok(None),
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");

    sigterm.recv().await;
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    // On non-Unix platforms, just wait forever
    std::future::pending::<()>().await
}
