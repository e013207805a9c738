//! Network-change outbound selector
//!
//! Listed SSIDs are trusted networks: joining one switches the host to
//! direct mode. Any other Wi-Fi network, and any cellular connection, gets
//! rule mode. Nothing happens unless the network differs from the one
//! recorded by the previous invocation.

use crate::config::OutboundConfig;
use crate::filter::SsidList;
use crate::host::HostContext;
use crate::network::{InterfaceKind, NetworkSnapshot};
use crate::notify::Notification;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

/// Outbound routing mode understood by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutboundMode {
    Direct,
    Rule,
    GlobalProxy,
}

impl OutboundMode {
    /// Value used by the host's HTTP API
    pub fn api_value(&self) -> &'static str {
        match self {
            OutboundMode::Direct => "direct",
            OutboundMode::Rule => "rule",
            OutboundMode::GlobalProxy => "proxy",
        }
    }
}

impl fmt::Display for OutboundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMode::Direct => write!(f, "Direct"),
            OutboundMode::Rule => write!(f, "Rule"),
            OutboundMode::GlobalProxy => write!(f, "Global Proxy"),
        }
    }
}

/// Store value recorded while on cellular. Longer than the 32-byte SSID
/// limit, so no Wi-Fi network can produce it.
pub const CELLULAR_STORE_VALUE: &str = "<cellular: primary interface is not Wi-Fi>";

/// The network an invocation observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkLabel {
    Wifi(String),
    Cellular,
}

impl NetworkLabel {
    /// Value recorded in the store for change detection
    pub fn store_value(&self) -> &str {
        match self {
            NetworkLabel::Wifi(ssid) => ssid,
            NetworkLabel::Cellular => CELLULAR_STORE_VALUE,
        }
    }
}

impl fmt::Display for NetworkLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkLabel::Wifi(ssid) => write!(f, "Wi-Fi: {}", ssid),
            NetworkLabel::Cellular => write!(f, "NetWork: CELLULAR"),
        }
    }
}

/// Result of one selector invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOutcome {
    Unchanged {
        network: NetworkLabel,
    },
    Changed {
        network: NetworkLabel,
        mode: OutboundMode,
        applied: bool,
    },
}

pub struct OutboundSelector {
    ssids: SsidList,
    store_key: String,
    wifi_interface: String,
}

impl OutboundSelector {
    pub fn new(ssids: SsidList, store_key: &str, wifi_interface: &str) -> Self {
        Self {
            ssids,
            store_key: store_key.to_string(),
            wifi_interface: wifi_interface.to_string(),
        }
    }

    pub fn from_config(config: &OutboundConfig) -> Self {
        Self::new(
            SsidList::new(config.ssids.clone()),
            &config.store_key,
            &config.wifi_interface,
        )
    }

    /// Label the network in a snapshot
    pub fn label(&self, snapshot: &NetworkSnapshot) -> NetworkLabel {
        match snapshot.interface_kind(&self.wifi_interface) {
            InterfaceKind::Wifi => NetworkLabel::Wifi(snapshot.ssid.clone().unwrap_or_default()),
            InterfaceKind::Cellular => NetworkLabel::Cellular,
        }
    }

    /// Mode for a network
    pub fn select_mode(&self, network: &NetworkLabel) -> OutboundMode {
        match network {
            NetworkLabel::Wifi(ssid) if self.ssids.contains(ssid) => OutboundMode::Direct,
            NetworkLabel::Wifi(_) => OutboundMode::Rule,
            NetworkLabel::Cellular => OutboundMode::Rule,
        }
    }

    /// Handle one network-change event
    pub async fn on_network_changed(&self, host: &HostContext) -> SelectorOutcome {
        let snapshot = host.network.snapshot();
        let network = self.label(&snapshot);

        let previous = match host.store.read(&self.store_key) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(key = %self.store_key, "Failed to read last network, treating as unknown: {}", e);
                None
            }
        };

        if previous.as_deref() == Some(network.store_value()) {
            info!(network = %network, "Network unchanged");
            return SelectorOutcome::Unchanged { network };
        }

        info!(
            previous = previous.as_deref().unwrap_or("<none>"),
            network = %network,
            "Network changed"
        );

        if let Err(e) = host.store.write(&self.store_key, network.store_value()) {
            error!(key = %self.store_key, "Failed to record network: {}", e);
        }

        let mode = self.select_mode(&network);
        let applied = host.outbound.set_outbound_mode(mode).await;

        if applied {
            info!(mode = %mode, "Outbound mode applied");
            let address = snapshot.primary_address.as_deref().unwrap_or("unknown");
            host.notifier.post(Notification::new(
                "Outbound",
                format!("Now used {} Mode", mode),
                format!("{}\nIP address: {}", network, address),
            ));
        } else {
            warn!(mode = %mode, "Host rejected outbound mode change");
        }

        SelectorOutcome::Changed {
            network,
            mode,
            applied,
        }
    }
}
