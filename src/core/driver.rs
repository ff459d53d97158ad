//! Driver facade for the wpa_supplicant control interface

use std::{
    path::Path,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{
    sync::{Mutex, broadcast},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    backend::{
        ControlChannel, DEFAULT_RESPONSE_CAPACITY, PowerControl, RequestSerializer,
        WpaCtrlChannel,
        codec::{self, Command, StatusReport},
        event::{self, Event},
    },
    core::{
        error::{WifiError, WifiResult},
        poller::{PollTargets, Poller},
        scanner::Scanner,
        state::ConnectionStateMachine,
        types::{AuthField, ConnectionStatus, NetworkRecord, ScanStatus},
    },
    protocol::Notification,
};

const NOTIFICATION_CAPACITY: usize = 64;

/// Runtime parameters of a [`WifiDriver`]
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub poll_interval: Duration,
    pub status_polling: bool,
    pub signal_polling: bool,
    /// Time after which a requested scan without results counts as failed
    pub scan_timeout: Duration,
    pub request_timeout: Duration,
    pub max_scan_results: usize,
    /// Largest accepted response or event datagram
    pub response_capacity: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            status_polling: true,
            signal_polling: true,
            scan_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            max_scan_results: 100,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }
}

/// wpa_supplicant driver
///
/// Owns the control channel, the cached connection state and the last scan
/// results. Public operations may be called concurrently from any task;
/// state changes are published as [`Notification`]s to every subscriber.
pub struct WifiDriver<C: ControlChannel, P: PowerControl> {
    requests: Arc<RequestSerializer<C>>,
    scanner: Scanner<C>,
    power: P,
    state: Mutex<ConnectionStateMachine>,
    poller: Poller,
    notifications: broadcast::Sender<Notification>,
    scan_timeout: Duration,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<P: PowerControl> WifiDriver<WpaCtrlChannel, P> {
    /// Opens the control socket at `path` and starts event processing
    ///
    /// Fails with [`WifiError::ChannelUnavailable`] if the daemon cannot be
    /// reached; the driver is unusable until a new `init`.
    pub async fn init(
        path: impl AsRef<Path>,
        power: P,
        options: DriverOptions,
    ) -> WifiResult<Arc<Self>> {
        info!("Initializing driver for {}", path.as_ref().display());

        let channel = WpaCtrlChannel::open(path, options.response_capacity).await?;
        let driver = Arc::new(Self::new(Arc::new(channel), power, options));
        driver.start().await;

        info!(
            connected = driver.status().await.connected,
            "Control interface initialized"
        );
        Ok(driver)
    }
}

impl<C: ControlChannel, P: PowerControl> WifiDriver<C, P> {
    pub fn new(channel: Arc<C>, power: P, options: DriverOptions) -> Self {
        let requests = Arc::new(RequestSerializer::new(channel, options.request_timeout));
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            scanner: Scanner::new(requests.clone(), options.max_scan_results),
            requests,
            power,
            state: Mutex::new(ConnectionStateMachine::new()),
            poller: Poller::new(
                options.poll_interval,
                options.status_polling,
                options.signal_polling,
            ),
            notifications,
            scan_timeout: options.scan_timeout,
            tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawns the event and poll tasks and reads the initial status
    pub async fn start(self: &Arc<Self>) {
        let events = tokio::spawn(Self::run_events(
            Arc::downgrade(self),
            self.requests.channel().clone(),
        ));
        let polls = tokio::spawn(Self::run_polls(Arc::downgrade(self), self.poller.ticker()));
        self.tasks().extend([events, polls]);

        if let Err(e) = self.check_connection().await {
            warn!("Initial status query failed: {}", e);
        }
    }

    /// Stops background processing and detaches from the daemon
    pub async fn shutdown(&self) {
        info!("Shutting down driver");
        for task in self.tasks().drain(..) {
            task.abort();
        }
        self.requests.channel().close().await;
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status().clone()
    }

    pub async fn scan_status(&self) -> ScanStatus {
        self.state.lock().await.scan_status()
    }

    pub async fn scan_results(&self) -> Vec<NetworkRecord> {
        self.scanner.results().await
    }

    fn publish(&self, notification: Notification) {
        debug!(?notification, "Publishing notification");
        // no subscribers is not an error
        let _ = self.notifications.send(notification);
    }

    fn publish_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.publish(notification);
        }
    }

    /// Switches the radio on and refreshes the connection state
    pub async fn turn_on(&self) {
        info!("Turning WiFi on");
        self.power.wifi_on();
        if let Err(e) = self.check_connection().await {
            debug!("Status unavailable after power on: {}", e);
        }
    }

    /// Switches the radio off; the driver reports disconnected right away
    pub async fn turn_off(&self) {
        info!("Turning WiFi off");
        self.power.wifi_off();
        let notifications = self.state.lock().await.power_off();
        self.publish_all(notifications);
    }

    /// Removes all network profiles and switches the radio off
    pub async fn reset(&self) -> WifiResult<()> {
        self.scanner.remove_all_networks().await?;
        self.scanner.clear_results().await;
        self.turn_off().await;
        info!("All networks removed");
        Ok(())
    }

    /// Configures `ssid` as the only WPA-PSK network and associates with it
    ///
    /// The connection itself is reported asynchronously through
    /// notifications.
    pub async fn join(&self, ssid: &str, password: &str) -> WifiResult<()> {
        self.scanner.join(ssid, password).await
    }

    /// Requests a scan; results are published when the daemon reports them
    ///
    /// If no results arrive within the scan timeout, the scan status moves
    /// to [`ScanStatus::ScanFailed`].
    pub async fn start_scan(self: &Arc<Self>) -> WifiResult<()> {
        let (generation, notification) = self.state.lock().await.begin_scan();
        self.publish_all(notification);

        if let Err(e) = self.scanner.start_scan().await {
            let notification = self
                .state
                .lock()
                .await
                .set_scan_status(ScanStatus::ScanFailed);
            self.publish_all(notification);
            return Err(e);
        }

        let driver = Arc::downgrade(self);
        let timeout = self.scan_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(driver) = driver.upgrade() {
                let notification = driver.state.lock().await.expire_scan(generation);
                driver.publish_all(notification);
            }
        });

        Ok(())
    }

    pub async fn wps_push_button_auth(&self, network: &NetworkRecord) -> WifiResult<()> {
        info!("WPS push button authentication with {}", network.bssid);
        self.scanner.wps_push_button(network).await
    }

    /// Answers a pending interactive authentication request
    ///
    /// Each request raised by the daemon accepts exactly one response;
    /// a response matching no pending request is rejected.
    pub async fn respond_to_auth(
        &self,
        field: AuthField,
        network_id: i32,
        value: &str,
    ) -> WifiResult<()> {
        let Some(request) = self.state.lock().await.take_auth_request(field, network_id) else {
            return Err(WifiError::InvalidParameter(format!(
                "no pending {field} request for network {network_id}"
            )));
        };

        if let Err(e) = self.scanner.respond_to_auth(field, network_id, value).await {
            self.state.lock().await.record_auth_request(&request);
            return Err(e);
        }

        self.publish(Notification::auth_responded(field, network_id));
        Ok(())
    }

    /// Re-reads `STATUS` and returns whether the interface is associated
    pub async fn check_connection(&self) -> WifiResult<bool> {
        let body = self.requests.send(&Command::Status).await?;
        let report = StatusReport::parse(&body);
        debug!(?report, "Status");

        let mut state = self.state.lock().await;
        let notifications = state.apply_status(&report);
        let connected = state.is_connected();
        drop(state);

        self.publish_all(notifications);
        Ok(connected)
    }

    pub fn set_status_polling(&self, enabled: bool) {
        self.poller.set_status_polling(enabled);
    }

    pub fn set_signal_polling(&self, enabled: bool) {
        self.poller.set_signal_polling(enabled);
    }

    /// Polls a tick would issue, `None` if both are disabled
    pub fn poll_targets(&self) -> Option<PollTargets> {
        self.poller.targets()
    }

    /// One poll tick; skipped entirely while disconnected
    pub async fn poll_once(&self, targets: PollTargets) {
        if !self.state.lock().await.is_connected() {
            debug!("Skipping poll: not connected");
            return;
        }

        if targets.status {
            if let Err(e) = self.check_connection().await {
                debug!("Status poll failed: {}", e);
            }
        }

        if targets.signal {
            match self.requests.send(&Command::SignalPoll).await {
                Ok(body) => {
                    let notification = self
                        .state
                        .lock()
                        .await
                        .apply_signal(codec::parse_signal(&body));
                    self.publish_all(notification);
                }
                Err(e) => debug!("Signal poll failed: {}", e),
            }
        }
    }

    /// Classifies one unsolicited message and applies its effects
    ///
    /// Malformed messages are logged and dropped.
    pub async fn handle_message(self: &Arc<Self>, message: &str) {
        let (priority, _) = event::strip_priority(message);
        let event = match event::parse_event(message) {
            Ok(event) => event,
            Err(e) => {
                warn!(priority, "Dropping event {:?}: {}", message.trim_end(), e);
                return;
            }
        };
        debug!(priority, ?event, "Event received");

        match &event {
            Event::AuthRequest(request) => {
                info!(
                    field = %request.field,
                    network_id = request.network_id,
                    "Interactive authentication requested"
                );
                self.state.lock().await.record_auth_request(request);
                self.publish(Notification::AuthenticationRequested(request.clone()));
            }
            Event::NetworkNotFound => info!("Configured network not found"),
            Event::WpsAvailable => info!("WPS push button available"),
            Event::WpsActive => info!("WPS push button configuration active"),
            Event::Unrecognized(text) => debug!("Unhandled event: {}", text),
            _ => {}
        }

        let notifications = self.state.lock().await.apply_event(&event);
        self.publish_all(notifications);

        if event == Event::ScanResults {
            // enumeration takes many exchanges; keep draining events meanwhile
            let driver = Arc::clone(self);
            tokio::spawn(async move {
                driver.refresh_scan_results().await;
            });
        }
    }

    /// Enumerates the daemon's scan results and publishes the full set
    pub async fn refresh_scan_results(&self) -> Vec<NetworkRecord> {
        let connected_bssid = {
            let state = self.state.lock().await;
            if state.is_connected() {
                state.status().bssid.clone()
            } else {
                String::new()
            }
        };

        let networks = self.scanner.enumerate_results(&connected_bssid).await;
        self.publish(Notification::networks_found(networks.clone()));
        networks
    }

    async fn run_events(driver: Weak<Self>, channel: Arc<C>) {
        loop {
            if let Err(e) = channel.readable().await {
                info!("Event stream closed: {}", e);
                return;
            }

            loop {
                let message = match channel.try_recv_event() {
                    Ok(Some(message)) => message,
                    Ok(None) => break,
                    Err(e @ WifiError::ChannelUnavailable { .. }) => {
                        info!("Event stream closed: {}", e);
                        return;
                    }
                    Err(e) => {
                        warn!("Failed to read event: {}", e);
                        break;
                    }
                };

                let Some(driver) = driver.upgrade() else {
                    return;
                };
                driver.handle_message(&message).await;
            }
        }
    }

    async fn run_polls(driver: Weak<Self>, mut ticker: tokio::time::Interval) {
        loop {
            ticker.tick().await;
            let Some(driver) = driver.upgrade() else {
                return;
            };
            if let Some(targets) = driver.poll_targets() {
                driver.poll_once(targets).await;
            }
        }
    }
}

impl<C: ControlChannel, P: PowerControl> Drop for WifiDriver<C, P> {
    fn drop(&mut self) {
        for task in self.tasks().drain(..) {
            task.abort();
        }
    }
}
