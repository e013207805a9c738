//! Network state snapshots

use crate::host::NetworkInfo;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// What the host reports about the current network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Current Wi-Fi SSID, absent when not associated
    pub ssid: Option<String>,
    /// Primary IPv4 address
    pub primary_address: Option<String>,
    /// Primary active interface identifier (e.g. `en0`, `pdp_ip0`)
    pub primary_interface: Option<String>,
}

impl NetworkSnapshot {
    pub fn wifi(ssid: &str, address: &str, interface: &str) -> Self {
        Self {
            ssid: Some(ssid.to_string()),
            primary_address: Some(address.to_string()),
            primary_interface: Some(interface.to_string()),
        }
    }

    pub fn cellular(address: &str, interface: &str) -> Self {
        Self {
            ssid: None,
            primary_address: Some(address.to_string()),
            primary_interface: Some(interface.to_string()),
        }
    }

    /// Classify the active interface against the configured Wi-Fi identifier.
    ///
    /// With no interface reported, the presence of an SSID decides.
    pub fn interface_kind(&self, wifi_interface: &str) -> InterfaceKind {
        match self.primary_interface.as_deref() {
            Some(iface) if iface == wifi_interface => InterfaceKind::Wifi,
            Some(_) => InterfaceKind::Cellular,
            None if self.ssid.is_some() => InterfaceKind::Wifi,
            None => InterfaceKind::Cellular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Wifi,
    Cellular,
}

/// Network snapshot supplied by the caller, replaceable between invocations
#[derive(Debug, Default)]
pub struct StaticNetwork {
    snapshot: RwLock<NetworkSnapshot>,
}

impl StaticNetwork {
    pub fn new(snapshot: NetworkSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn set(&self, snapshot: NetworkSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

impl NetworkInfo for StaticNetwork {
    fn snapshot(&self) -> NetworkSnapshot {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
