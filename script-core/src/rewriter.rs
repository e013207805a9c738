//! Ad-stripping response rewriter
//!
//! Matches an intercepted response's request URL against a fixed set of ad
//! endpoints and patches the JSON body so the client app skips the ad.
//! Failures are logged and leave the body untouched.

use crate::config::RewriterConfig;
use crate::error::{RewriteError, RewriteStage, ScriptError};
use crate::host::PersistentStore;
use crate::store::{load_or_initialize, parse_delimited};
use crate::Result;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Known ad endpoints. Their URL prefixes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdEndpoint {
    /// Splash-screen ad shown at launch
    BootAd,
    /// Popup bubble in the live-stream view
    PopupAd,
}

impl AdEndpoint {
    pub const ALL: [AdEndpoint; 2] = [AdEndpoint::BootAd, AdEndpoint::PopupAd];

    pub fn name(&self) -> &'static str {
        match self {
            AdEndpoint::BootAd => "bootAd",
            AdEndpoint::PopupAd => "popupAd",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            AdEndpoint::BootAd => r"^https?://pocketapi\.48\.cn/home/api/ad/v1/bootAd",
            AdEndpoint::PopupAd => r"^https?://pocketapi\.48\.cn/home/api/ad/v1/popupAd",
        }
    }

    fn patch(&self, content: &mut Map<String, Value>, config: &RewriterConfig) {
        match self {
            AdEndpoint::BootAd => {
                content.insert("adExist".to_string(), Value::Bool(false));
                content.insert(
                    "zipUrl".to_string(),
                    Value::String(config.placeholder_zip_url.clone()),
                );
            }
            AdEndpoint::PopupAd => {
                content.insert("show".to_string(), Value::Bool(false));
                content.insert(
                    "lastUpdateTime".to_string(),
                    Value::from(config.popup_last_update_time),
                );
            }
        }
    }
}

/// One intercepted HTTP event as delivered by the host
#[derive(Debug, Clone, Copy)]
pub struct InterceptedEvent<'a> {
    pub is_response: bool,
    pub url: &'a str,
    pub body: Option<&'a str>,
}

impl<'a> InterceptedEvent<'a> {
    pub fn response(url: &'a str, body: &'a str) -> Self {
        Self {
            is_response: true,
            url,
            body: Some(body),
        }
    }

    pub fn request(url: &'a str) -> Self {
        Self {
            is_response: false,
            url,
            body: None,
        }
    }
}

/// Why a body was left as-is
#[derive(Debug, Clone)]
pub enum Unchanged {
    /// Invoked for a request rather than a response
    NotAResponse,
    /// URL matched no known endpoint
    Unmatched,
    /// Endpoint matched but the body could not be patched
    Failed(RewriteError),
}

/// Result of one rewriter invocation
#[derive(Debug, Clone)]
pub enum RewriteOutcome {
    Rewritten { endpoint: AdEndpoint, body: String },
    Unchanged(Unchanged),
}

impl RewriteOutcome {
    /// The replacement body to hand back to the host, if any
    pub fn into_body(self) -> Option<String> {
        match self {
            RewriteOutcome::Rewritten { body, .. } => Some(body),
            RewriteOutcome::Unchanged(_) => None,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, RewriteOutcome::Rewritten { .. })
    }
}

pub struct ResponseRewriter {
    rules: Vec<(AdEndpoint, Regex)>,
    config: RewriterConfig,
    blacklist: Vec<String>,
}

impl ResponseRewriter {
    /// Build the rewriter, loading the blacklist from the store (and
    /// initialising it on first use).
    pub fn new(config: RewriterConfig, store: &dyn PersistentStore) -> Result<Self> {
        let raw = load_or_initialize(store, &config.blacklist_key, &config.blacklist_default)?;
        let blacklist = parse_delimited(&raw);
        debug!(entries = blacklist.len(), "Blacklist loaded");

        let rules = AdEndpoint::ALL
            .iter()
            .map(|endpoint| {
                Regex::new(endpoint.pattern())
                    .map(|re| (*endpoint, re))
                    .map_err(|e| {
                        ScriptError::Configuration(format!(
                            "Invalid pattern for {}: {}",
                            endpoint.name(),
                            e
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            config,
            blacklist,
        })
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Find the endpoint a URL belongs to
    pub fn match_endpoint(&self, url: &str) -> Option<AdEndpoint> {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(url))
            .map(|(endpoint, _)| *endpoint)
    }

    /// Handle one intercepted event
    pub fn rewrite(&self, event: &InterceptedEvent<'_>) -> RewriteOutcome {
        if !event.is_response {
            warn!(url = event.url, "Unexpected request dispatch, check the rewrite configuration");
            return RewriteOutcome::Unchanged(Unchanged::NotAResponse);
        }

        let endpoint = match self.match_endpoint(event.url) {
            Some(endpoint) => endpoint,
            None => {
                warn!(url = event.url, "No ad endpoint matched, check the rewrite configuration");
                return RewriteOutcome::Unchanged(Unchanged::Unmatched);
            }
        };

        match self.patch_body(endpoint, event.body) {
            Ok(body) => {
                info!(url = event.url, endpoint = endpoint.name(), "Ad response rewritten");
                RewriteOutcome::Rewritten { endpoint, body }
            }
            Err(err) => {
                error!(url = event.url, stage = %err.stage, "{}", err);
                RewriteOutcome::Unchanged(Unchanged::Failed(err))
            }
        }
    }

    fn patch_body(
        &self,
        endpoint: AdEndpoint,
        body: Option<&str>,
    ) -> std::result::Result<String, RewriteError> {
        let name = endpoint.name();
        let body = body.ok_or_else(|| RewriteError::new(name, RewriteStage::Parse, "missing body"))?;

        let mut root: Value = serde_json::from_str(body)
            .map_err(|e| RewriteError::new(name, RewriteStage::Parse, e.to_string()))?;

        let content = root
            .get_mut("content")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                RewriteError::new(name, RewriteStage::Patch, "`content` is missing or not an object")
            })?;
        endpoint.patch(content, &self.config);

        serde_json::to_string(&root)
            .map_err(|e| RewriteError::new(name, RewriteStage::Serialize, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const BOOT_URL: &str = "https://pocketapi.48.cn/home/api/ad/v1/bootAd?platform=ios";
    const POPUP_URL: &str = "http://pocketapi.48.cn/home/api/ad/v1/popupAd";

    fn rewriter() -> ResponseRewriter {
        ResponseRewriter::new(RewriterConfig::default(), &MemoryStore::new()).unwrap()
    }

    #[test]
    fn test_endpoint_matching() {
        let rw = rewriter();
        assert_eq!(rw.match_endpoint(BOOT_URL), Some(AdEndpoint::BootAd));
        assert_eq!(rw.match_endpoint(POPUP_URL), Some(AdEndpoint::PopupAd));
        assert_eq!(rw.match_endpoint("https://pocketapi.48.cn/home/api/other"), None);
        assert_eq!(
            rw.match_endpoint("https://evil.example/?u=https://pocketapi.48.cn/home/api/ad/v1/bootAd"),
            None
        );
    }

    #[test]
    fn test_boot_ad_patch_preserves_other_fields() {
        let rw = rewriter();
        let body = r#"{"status":200,"success":true,"content":{"adExist":true,"zipUrl":"https://ads.example/ad.zip","duration":5},"message":"ok"}"#;
        let out = rw.rewrite(&InterceptedEvent::response(BOOT_URL, body)).into_body().unwrap();
        assert_eq!(
            out,
            r#"{"status":200,"success":true,"content":{"adExist":false,"zipUrl":"https://source.48.cn/20210527/1622011896626.zip","duration":5},"message":"ok"}"#
        );
    }

    #[test]
    fn test_popup_ad_patch() {
        let rw = rewriter();
        let body = r#"{"content":{"show":true,"lastUpdateTime":1622011896626,"title":"gift"}}"#;
        let out = rw.rewrite(&InterceptedEvent::response(POPUP_URL, body)).into_body().unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["content"]["show"], Value::Bool(false));
        assert_eq!(value["content"]["lastUpdateTime"], Value::from(4084432629000u64));
        assert_eq!(value["content"]["title"], "gift");
    }

    #[test]
    fn test_missing_content_is_patch_failure() {
        let rw = rewriter();
        let outcome = rw.rewrite(&InterceptedEvent::response(BOOT_URL, r#"{"status":200}"#));
        match outcome {
            RewriteOutcome::Unchanged(Unchanged::Failed(err)) => {
                assert_eq!(err.stage, RewriteStage::Patch);
                assert_eq!(err.endpoint, "bootAd");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_body_is_parse_failure() {
        let rw = rewriter();
        let outcome = rw.rewrite(&InterceptedEvent::response(POPUP_URL, "<html>502</html>"));
        assert!(matches!(
            outcome,
            RewriteOutcome::Unchanged(Unchanged::Failed(RewriteError { stage: RewriteStage::Parse, .. }))
        ));
    }

    #[test]
    fn test_request_dispatch_is_noop() {
        let rw = rewriter();
        assert!(matches!(
            rw.rewrite(&InterceptedEvent::request(BOOT_URL)),
            RewriteOutcome::Unchanged(Unchanged::NotAResponse)
        ));
    }

    #[test]
    fn test_blacklist_initialised_in_store() {
        let store = MemoryStore::new();
        let rw = ResponseRewriter::new(RewriterConfig::default(), &store).unwrap();
        assert!(rw.blacklist().is_empty());
        assert_eq!(store.read("Pocket48_black").unwrap(), Some(String::new()));

        store.write("Pocket48_black", "member-a;member-b").unwrap();
        let rw = ResponseRewriter::new(RewriterConfig::default(), &store).unwrap();
        assert_eq!(rw.blacklist(), &["member-a".to_string(), "member-b".to_string()]);
    }
}
