//! Connection and scan state machine
//!
//! All transitions are pure: each method updates the cached state and
//! returns the notifications the change warrants. Re-entering the current
//! state yields nothing.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    backend::{codec::StatusReport, event::Event},
    core::types::{AuthField, ConnectionStatus, PendingAuthRequest, ScanStatus},
    protocol::Notification,
};

#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    status: ConnectionStatus,
    scan_status: ScanStatus,
    scan_generation: u64,
    /// Unanswered interactive authentication requests
    pending_auth: HashMap<(AuthField, i32), PendingAuthRequest>,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.connected
    }

    pub fn scan_status(&self) -> ScanStatus {
        self.scan_status
    }

    pub fn set_connected(&mut self, connected: bool) -> Option<Notification> {
        if self.status.connected == connected {
            return None;
        }
        debug!(connected, "Connection state changed");
        self.status.connected = connected;
        Some(Notification::connection(connected))
    }

    /// Merges a decoded `STATUS` response
    ///
    /// The cached signal strength is kept; `STATUS` does not carry it.
    pub fn apply_status(&mut self, report: &StatusReport) -> Vec<Notification> {
        let mut notifications = Vec::new();

        if report.ssid != self.status.name {
            self.status.name = report.ssid.clone();
            notifications.push(Notification::network_name(&report.ssid));
        }
        if report.ip_address != self.status.ip_address {
            self.status.ip_address = report.ip_address.clone();
            notifications.push(Notification::ip_address(&report.ip_address));
        }
        if report.mac_address != self.status.mac_address {
            self.status.mac_address = report.mac_address.clone();
            notifications.push(Notification::mac_address(&report.mac_address));
        }
        self.status.bssid = report.bssid.clone();

        notifications.extend(self.set_connected(report.connected()));
        notifications
    }

    pub fn apply_signal(&mut self, value: i32) -> Option<Notification> {
        if value == self.status.signal_strength {
            return None;
        }
        self.status.signal_strength = value;
        Some(Notification::signal_strength(value))
    }

    /// Every actual transition starts a new scan generation
    pub fn set_scan_status(&mut self, status: ScanStatus) -> Option<Notification> {
        if self.scan_status == status {
            return None;
        }
        debug!(?status, "Scan status changed");
        self.scan_status = status;
        self.scan_generation = self.scan_generation.wrapping_add(1);
        Some(Notification::scan_status(status))
    }

    /// Enters `Scanning` for a scan this driver requested
    ///
    /// Returns the generation that [`expire_scan`](Self::expire_scan) must
    /// present to fail this particular scan.
    pub fn begin_scan(&mut self) -> (u64, Option<Notification>) {
        let notification = self.set_scan_status(ScanStatus::Scanning);
        if notification.is_none() {
            // already scanning on the daemon's behalf; take over with a new timer
            self.scan_generation = self.scan_generation.wrapping_add(1);
        }
        (self.scan_generation, notification)
    }

    /// Fails the scan of `generation` if it is still running
    pub fn expire_scan(&mut self, generation: u64) -> Option<Notification> {
        if generation != self.scan_generation || self.scan_status != ScanStatus::Scanning {
            return None;
        }
        debug!(generation, "Scan timed out");
        self.set_scan_status(ScanStatus::ScanFailed)
    }

    /// Applies the state effect of an unsolicited event
    pub fn apply_event(&mut self, event: &Event) -> Vec<Notification> {
        match event {
            Event::Connected => self.set_connected(true).into_iter().collect(),
            Event::Disconnected | Event::Terminating => {
                self.set_connected(false).into_iter().collect()
            }
            Event::ScanStarted => self.set_scan_status(ScanStatus::Scanning).into_iter().collect(),
            Event::ScanResults => self.set_scan_status(ScanStatus::ScanOk).into_iter().collect(),
            Event::ScanFailed => self
                .set_scan_status(ScanStatus::ScanFailed)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn record_auth_request(&mut self, request: &PendingAuthRequest) {
        self.pending_auth
            .insert((request.field, request.network_id), request.clone());
    }

    /// Removes the request a response for `field` and `network_id` answers
    pub fn take_auth_request(
        &mut self,
        field: AuthField,
        network_id: i32,
    ) -> Option<PendingAuthRequest> {
        self.pending_auth.remove(&(field, network_id))
    }

    /// State after the radio has been switched off
    pub fn power_off(&mut self) -> Vec<Notification> {
        self.pending_auth.clear();
        self.set_connected(false)
            .into_iter()
            .chain(self.set_scan_status(ScanStatus::Idle))
            .collect()
    }
}
