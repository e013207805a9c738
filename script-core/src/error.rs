//! Error types for script operations

use thiserror::Error;

/// Main error type for script operations
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A check-in account row failed validation at load time
    #[error("Invalid account row {row}: {reason}")]
    InvalidAccount { row: usize, reason: String },

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Outbound HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network-related errors (listeners, admin API, proxy)
    #[error("Network error: {0}")]
    Network(String),

    /// Certificate-related errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Create an account validation error for a zero-based row index
    pub fn invalid_account(row: usize, reason: &str) -> Self {
        Self::InvalidAccount {
            row,
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for ScriptError {
    fn from(err: reqwest::Error) -> Self {
        ScriptError::Http(err.to_string())
    }
}

impl From<toml::de::Error> for ScriptError {
    fn from(err: toml::de::Error) -> Self {
        ScriptError::Configuration(err.to_string())
    }
}

/// Stage at which a response rewrite failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStage {
    Parse,
    Patch,
    Serialize,
}

impl std::fmt::Display for RewriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewriteStage::Parse => write!(f, "parse"),
            RewriteStage::Patch => write!(f, "patch"),
            RewriteStage::Serialize => write!(f, "serialize"),
        }
    }
}

/// Error raised while patching an intercepted response body.
///
/// These never escape the rewriter: they are logged and the body is left
/// untouched.
#[derive(Debug, Clone, Error)]
#[error("{endpoint} rewrite failed at {stage} stage: {reason}")]
pub struct RewriteError {
    pub endpoint: &'static str,
    pub stage: RewriteStage,
    pub reason: String,
}

impl RewriteError {
    pub fn new(endpoint: &'static str, stage: RewriteStage, reason: impl Into<String>) -> Self {
        Self {
            endpoint,
            stage,
            reason: reason.into(),
        }
    }
}
