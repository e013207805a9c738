//! Script Core Library
//!
//! Event handlers for a traffic-interception host: an ad-stripping response
//! rewriter, a scheduled check-in runner and a network-change outbound
//! selector. Handlers reach the host only through the capability traits in
//! [`host`], so the same code runs behind the bundled MITM proxy, from the
//! agent CLI, or against the in-memory fakes.

pub mod admin;
pub mod ca;
pub mod filter;
pub mod handlers;
pub mod http;
pub mod network;
pub mod notify;
pub mod proxy;
pub mod store;

/// Capability traits and the injected host context
pub mod host;

/// Recording in-memory host for tests and dry runs
pub mod fakes;

/// Configuration types and utilities
pub mod config;

/// Error types for script operations
pub mod error;

/// Handlers
pub mod checkin;
pub mod outbound;
pub mod rewriter;

pub use admin::{Metrics, MetricsSnapshot};
pub use ca::CertificateAuthority;
pub use checkin::{Account, AccountTable, CheckinOutcome, CheckinReport, CheckinRunner, CheckinStatus};
pub use config::{
    CheckinConfig, LoggingConfig, OutboundConfig, ProxyConfig, RewriterConfig, ScriptConfig,
    StoreConfig,
};
pub use error::{RewriteError, RewriteStage, ScriptError};
pub use filter::SsidList;
pub use handlers::RewriteHandler;
pub use host::{
    HostContext, HttpClient, HttpRequest, HttpResponse, NetworkInfo, Notifier, OutboundController,
    PersistentStore,
};
pub use http::{ReqwestClient, SurgeApiController};
pub use network::{InterfaceKind, NetworkSnapshot, StaticNetwork};
pub use notify::{Notification, TracingNotifier};
pub use outbound::{
    NetworkLabel, OutboundMode, OutboundSelector, SelectorOutcome, CELLULAR_STORE_VALUE,
};
pub use proxy::ProxyServer;
pub use rewriter::{AdEndpoint, InterceptedEvent, ResponseRewriter, RewriteOutcome, Unchanged};
pub use store::{load_or_initialize, FileStore, MemoryStore};

/// Result type alias for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;
