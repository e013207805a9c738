//! HTTP bindings for the host capabilities

use crate::host::{HttpClient, HttpRequest, HttpResponse, OutboundController};
use crate::outbound::OutboundMode;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// [`HttpClient`] backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse { status, body })
    }
}

/// Switches outbound mode through the host's HTTP API
/// (`POST {base}/v1/outbound` with `{"mode": ...}`).
#[derive(Debug, Clone)]
pub struct SurgeApiController {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SurgeApiController {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/outbound", self.base_url)
    }
}

#[async_trait]
impl OutboundController for SurgeApiController {
    async fn set_outbound_mode(&self, mode: OutboundMode) -> bool {
        let mut builder = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({ "mode": mode.api_value() }));
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Key", key.as_str());
        }

        match builder.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(mode = %mode, status = %response.status(), "Outbound mode change refused");
                false
            }
            Err(e) => {
                warn!(mode = %mode, "Outbound mode change failed: {}", e);
                false
            }
        }
    }
}
