use crate::Result;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::info;

/// Counters shared between the rewrite handler and the admin API
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub matched_responses: AtomicU64,
    pub rewritten: AtomicU64,
    pub rewrite_failures: AtomicU64,
    pub body_read_errors: AtomicU64,
    pub encoded_passthrough: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub matched_responses: u64,
    pub rewritten: u64,
    pub rewrite_failures: u64,
    pub body_read_errors: u64,
    pub encoded_passthrough: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            matched_responses: self.matched_responses.load(Ordering::Relaxed),
            rewritten: self.rewritten.load(Ordering::Relaxed),
            rewrite_failures: self.rewrite_failures.load(Ordering::Relaxed),
            body_read_errors: self.body_read_errors.load(Ordering::Relaxed),
            encoded_passthrough: self.encoded_passthrough.load(Ordering::Relaxed),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

pub async fn start_admin_server(port: u16, metrics: Arc<Metrics>) -> Result<()> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(move || metrics_handler(metrics)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting Admin API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::error::ScriptError::Network(format!("Failed to bind admin port {}: {}", port, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::ScriptError::Network(format!("Admin server failed: {}", e)))?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn metrics_handler(metrics: Arc<Metrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
