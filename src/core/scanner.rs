//! Network scanning and network profile management

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    backend::{
        ControlChannel, RequestSerializer,
        codec::{self, BssRecord, Command, NetworkValue},
    },
    core::{
        error::{WifiError, WifiResult},
        types::{AuthField, AuthenticationKind, JoinStep, NetworkRecord},
    },
};

/// Scan cycle and profile commands on top of the serialized channel
///
/// Scan results arrive asynchronously: [`start_scan`](Self::start_scan)
/// only triggers the daemon, and the driver calls
/// [`enumerate_results`](Self::enumerate_results) once the results event
/// has been received.
pub struct Scanner<C: ControlChannel> {
    requests: Arc<RequestSerializer<C>>,
    max_results: usize,
    results: RwLock<Vec<NetworkRecord>>,
}

impl<C: ControlChannel> Scanner<C> {
    pub fn new(requests: Arc<RequestSerializer<C>>, max_results: usize) -> Self {
        Self {
            requests,
            max_results,
            results: RwLock::new(Vec::new()),
        }
    }

    /// Asks the daemon to start a scan
    pub async fn start_scan(&self) -> WifiResult<()> {
        self.requests.send(&Command::Scan).await?;
        Ok(())
    }

    /// Queries BSS records by index until the daemon has no more
    ///
    /// Enumeration ends at the first empty body or failed query. The result
    /// set replaces the previous one.
    pub async fn enumerate_results(&self, connected_bssid: &str) -> Vec<NetworkRecord> {
        let mut networks = Vec::new();

        for index in 0..self.max_results {
            let body = match self.requests.send(&Command::Bss(index)).await {
                Ok(body) => body,
                Err(e) => {
                    debug!(index, "BSS enumeration stopped: {}", e);
                    break;
                }
            };

            let Some(bss) = BssRecord::parse(&body) else {
                break;
            };

            let network = self.network_record(bss, index, connected_bssid).await;
            debug!(?network, "Network found");
            networks.push(network);
        }

        info!("Scan results: {} networks", networks.len());
        *self.results.write().await = networks.clone();
        networks
    }

    async fn network_record(
        &self,
        bss: BssRecord,
        index: usize,
        connected_bssid: &str,
    ) -> NetworkRecord {
        let authentication = self.authentication(&bss, index).await;
        let connected =
            !connected_bssid.trim().is_empty() && bss.bssid.eq_ignore_ascii_case(connected_bssid);

        NetworkRecord {
            wps_available: bss.wps_available(),
            name: bss.ssid,
            bssid: bss.bssid,
            signal_level: bss.level,
            authentication,
            connected,
            wps_device_name: bss.wps_device_name,
            wps_primary_device_type: bss.wps_primary_device_type,
        }
    }

    /// Classifies the access point, asking for `auth_alg` to tell WEP variants apart
    async fn authentication(&self, bss: &BssRecord, index: usize) -> AuthenticationKind {
        let kind = codec::authentication_from_flags(&bss.flags);
        if kind != AuthenticationKind::NoneWep {
            return kind;
        }

        // addressed by enumeration index, not by the BSS table `id`
        let id = index as i32;
        match self
            .requests
            .send(&Command::GetNetwork {
                id,
                key: "auth_alg",
            })
            .await
        {
            Ok(auth_alg) => codec::refine_wep(kind, &auth_alg),
            Err(e) => {
                debug!(id, "auth_alg query failed: {}", e);
                kind
            }
        }
    }

    /// Last enumerated result set
    pub async fn results(&self) -> Vec<NetworkRecord> {
        self.results.read().await.clone()
    }

    pub async fn clear_results(&self) {
        self.results.write().await.clear();
    }

    /// Replaces all network profiles with a single WPA-PSK profile and
    /// associates with it
    ///
    /// If a step after `ADD_NETWORK` fails, the new profile is removed again
    /// before the failure is reported.
    pub async fn join(&self, ssid: &str, password: &str) -> WifiResult<()> {
        if ssid.is_empty() {
            return Err(WifiError::InvalidParameter("empty SSID".into()));
        }
        reject_line_breaks("SSID", ssid)?;
        reject_line_breaks("password", password)?;

        info!("Joining network {}", ssid);

        self.requests
            .send(&Command::RemoveAllNetworks)
            .await
            .map_err(|e| e.at_join_step(JoinStep::RemoveNetworks))?;

        let id = self
            .requests
            .send(&Command::AddNetwork)
            .await
            .and_then(|body| codec::parse_network_id(&body))
            .map_err(|e| e.at_join_step(JoinStep::AddNetwork))?;

        let steps = [
            (
                JoinStep::SetSsid,
                Command::SetNetwork {
                    id,
                    key: "ssid",
                    value: NetworkValue::ssid(ssid),
                },
            ),
            (
                JoinStep::SetKeyMgmt,
                Command::SetNetwork {
                    id,
                    key: "key_mgmt",
                    value: NetworkValue::Raw("WPA-PSK".into()),
                },
            ),
            (
                JoinStep::SetPsk,
                Command::SetNetwork {
                    id,
                    key: "psk",
                    value: NetworkValue::psk(password),
                },
            ),
            (JoinStep::SaveConfig, Command::SaveConfig),
            (JoinStep::EnableNetwork, Command::EnableNetwork(id)),
            (JoinStep::Reassociate, Command::Reassociate),
        ];

        let mut saved = false;
        for (step, command) in steps {
            if let Err(e) = self.requests.send(&command).await {
                warn!(%step, "Join failed: {}", e);
                self.roll_back(id, saved).await;
                return Err(e.at_join_step(step));
            }
            saved |= step == JoinStep::SaveConfig;
        }

        info!("Network profile {} for {} enabled", id, ssid);
        Ok(())
    }

    async fn roll_back(&self, id: u32, saved: bool) {
        if let Err(e) = self.requests.send(&Command::RemoveNetwork(id)).await {
            warn!(id, "Failed to remove partial network profile: {}", e);
            return;
        }
        if saved {
            if let Err(e) = self.requests.send(&Command::SaveConfig).await {
                warn!("Failed to persist profile removal: {}", e);
            }
        }
    }

    /// Removes every network profile and persists the empty configuration
    pub async fn remove_all_networks(&self) -> WifiResult<()> {
        info!("Removing all networks");
        self.requests.send(&Command::RemoveAllNetworks).await?;
        self.requests.send(&Command::SaveConfig).await?;
        Ok(())
    }

    /// Starts WPS push-button enrollment with the given access point
    pub async fn wps_push_button(&self, network: &NetworkRecord) -> WifiResult<()> {
        if network.bssid.trim().is_empty() {
            return Err(WifiError::InvalidParameter("network without bssid".into()));
        }
        self.requests
            .send(&Command::WpsPbc(network.bssid.clone()))
            .await?;
        Ok(())
    }

    /// Answers an interactive authentication request
    pub async fn respond_to_auth(
        &self,
        field: AuthField,
        network_id: i32,
        value: &str,
    ) -> WifiResult<()> {
        reject_line_breaks("authentication response", value)?;
        self.requests
            .send(&Command::CtrlResponse {
                field,
                network_id,
                value: value.to_string(),
            })
            .await?;
        Ok(())
    }
}

fn reject_line_breaks(what: &str, value: &str) -> WifiResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(WifiError::InvalidParameter(format!(
            "{what} must not contain line breaks"
        )));
    }
    Ok(())
}
