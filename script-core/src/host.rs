//! Host capability interfaces
//!
//! Every handler reaches the outside world only through these traits. A
//! [`HostContext`] bundles one implementation of each so handlers can be
//! driven by the real bindings (file store, reqwest, the host's HTTP API)
//! or by the in-memory fakes in [`crate::fakes`].

use crate::network::NetworkSnapshot;
use crate::notify::Notification;
use crate::outbound::OutboundMode;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound HTTP request issued by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Response metadata and body text returned by the HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Awaitable outbound HTTP client.
///
/// Transport failures are returned as errors; non-2xx statuses are not
/// errors and are left for the caller to interpret.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Key-value persistent store
pub trait PersistentStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Notification poster
pub trait Notifier: Send + Sync {
    fn post(&self, notification: Notification);
}

/// Network-state accessor
pub trait NetworkInfo: Send + Sync {
    fn snapshot(&self) -> NetworkSnapshot;
}

/// Outbound-mode setter. Returns whether the host accepted the change.
#[async_trait]
pub trait OutboundController: Send + Sync {
    async fn set_outbound_mode(&self, mode: OutboundMode) -> bool;
}

/// Capabilities injected into a handler invocation
#[derive(Clone)]
pub struct HostContext {
    pub store: Arc<dyn PersistentStore>,
    pub notifier: Arc<dyn Notifier>,
    pub http: Arc<dyn HttpClient>,
    pub network: Arc<dyn NetworkInfo>,
    pub outbound: Arc<dyn OutboundController>,
}

impl HostContext {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        notifier: Arc<dyn Notifier>,
        http: Arc<dyn HttpClient>,
        network: Arc<dyn NetworkInfo>,
        outbound: Arc<dyn OutboundController>,
    ) -> Self {
        Self {
            store,
            notifier,
            http,
            network,
            outbound,
        }
    }
}
