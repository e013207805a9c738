//! Configuration types and utilities

use crate::checkin::AccountTable;
use crate::error::ScriptError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration, usually loaded from a TOML file.
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub rewriter: RewriterConfig,
    pub checkin: CheckinConfig,
    pub outbound: OutboundConfig,
    pub store: StoreConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

impl ScriptConfig {
    /// Load and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScriptError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: ScriptConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.checkin.account_table()?;

        if let Some(index) = self.outbound.ssids.iter().position(|s| s.trim().is_empty()) {
            return Err(ScriptError::Configuration(format!(
                "outbound.ssids[{}] is empty",
                index
            )));
        }
        if self.outbound.store_key.is_empty() {
            return Err(ScriptError::Configuration(
                "outbound.store_key must not be empty".to_string(),
            ));
        }
        if self.checkin.cookie_key.is_empty() {
            return Err(ScriptError::Configuration(
                "checkin.cookie_key must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.checkin.endpoint).map_err(|e| {
            ScriptError::Configuration(format!("checkin.endpoint is not a valid URL: {}", e))
        })?;
        Ok(())
    }
}

/// Ad-stripping response rewriter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    /// Archive URL substituted for the boot-ad payload
    pub placeholder_zip_url: String,
    /// Epoch milliseconds written to the popup ad's `lastUpdateTime`
    pub popup_last_update_time: u64,
    /// Store key holding the semicolon-delimited blacklist
    pub blacklist_key: String,
    /// Value written to `blacklist_key` on first use
    pub blacklist_default: String,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            placeholder_zip_url: "https://source.48.cn/20210527/1622011896626.zip".to_string(),
            popup_last_update_time: 4_084_432_629_000,
            blacklist_key: "Pocket48_black".to_string(),
            blacklist_default: String::new(),
        }
    }
}

/// Scheduled check-in settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    /// Check-in endpoint, without query string
    pub endpoint: String,
    /// Store key holding the session cookie
    pub cookie_key: String,
    /// `[name, id]` rows, checked in top to bottom
    pub accounts: Vec<Vec<String>>,
    /// Per-request timeout for the HTTP client binding
    pub request_timeout_secs: u64,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://weibo.com/p/aj/general/button".to_string(),
            cookie_key: "super_cookie".to_string(),
            accounts: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

impl CheckinConfig {
    /// Validate the account rows into a table
    pub fn account_table(&self) -> Result<AccountTable> {
        AccountTable::from_rows(&self.accounts)
    }
}

/// Network-change outbound selector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Trusted Wi-Fi networks that go direct
    pub ssids: Vec<String>,
    /// Store key for the last seen SSID
    pub store_key: String,
    /// Interface identifier of the Wi-Fi adapter
    pub wifi_interface: String,
    /// Base URL of the host's HTTP API, if mode changes go over HTTP
    pub api_url: Option<String>,
    /// `X-Key` for the host's HTTP API
    pub api_key: Option<String>,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            ssids: Vec::new(),
            store_key: "current_wifi_ssid".to_string(),
            wifi_interface: "en0".to_string(),
            api_url: None,
            api_key: None,
        }
    }
}

/// Persistent store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./netscript-store.json"),
        }
    }
}

/// Rewriting proxy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address to listen on
    pub listen_address: String,
    /// Port to listen on
    pub listen_port: u16,
    /// Admin API port
    pub admin_port: u16,
    /// Directory holding the root CA (`ca.pem`, `ca.key`)
    pub cert_store_path: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8080,
            admin_port: 9091,
            cert_store_path: PathBuf::from("./certs"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to enable JSON formatted logs
    pub json_format: bool,
    /// Whether to enable colored output (only for non-JSON format)
    pub enable_colors: bool,
    /// Log file path (optional, if None logs only to stdout)
    pub log_file: Option<String>,
    /// Module-specific log levels
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_levels = HashMap::new();
        module_levels.insert("hudsucker".to_string(), "warn".to_string());
        module_levels.insert("hyper".to_string(), "warn".to_string());
        module_levels.insert("reqwest".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            enable_colors: true,
            log_file: None,
            module_levels,
        }
    }
}
