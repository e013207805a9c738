//! In-memory host capabilities that record what handlers do.
//!
//! Used by the tests and by the agent's `--dry-run` mode.

use crate::error::ScriptError;
use crate::host::{
    HostContext, HttpClient, HttpRequest, HttpResponse, Notifier, OutboundController,
    PersistentStore,
};
use crate::network::{NetworkSnapshot, StaticNetwork};
use crate::notify::Notification;
use crate::outbound::OutboundMode;
use crate::store::MemoryStore;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Memory store that keeps a log of writes
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }
}

impl PersistentStore for RecordingStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.writes).push((key.to_string(), value.to_string()));
        self.inner.write(key, value)
    }
}

/// Notifier that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<Notification> {
        lock(&self.posted).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notification: Notification) {
        info!(title = %notification.title, subtitle = %notification.subtitle, body = %notification.body, "Notification (recorded)");
        lock(&self.posted).push(notification);
    }
}

/// HTTP client that replays queued responses in order.
///
/// Each call records its request, sleeps for the configured latency and
/// pops the next queued result; an empty queue is a transport error.
/// The highest number of overlapping calls is tracked.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    responses: Mutex<VecDeque<std::result::Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue a successful response
    pub fn push_body(&self, status: u16, body: &str) {
        lock(&self.responses).push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: &str) {
        lock(&self.responses).push_back(Err(error.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        lock(&self.requests).push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = lock(&self.responses).pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(ScriptError::Http(error)),
            None => Err(ScriptError::Http("no scripted response".to_string())),
        }
    }
}

/// Outbound controller that records requested modes
#[derive(Debug)]
pub struct RecordingOutbound {
    accept: AtomicBool,
    requested: Mutex<Vec<OutboundMode>>,
}

impl Default for RecordingOutbound {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordingOutbound {
    pub fn new(accept: bool) -> Self {
        Self {
            accept: AtomicBool::new(accept),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn requested(&self) -> Vec<OutboundMode> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl OutboundController for RecordingOutbound {
    async fn set_outbound_mode(&self, mode: OutboundMode) -> bool {
        lock(&self.requested).push(mode);
        self.accept.load(Ordering::SeqCst)
    }
}

/// A complete fake host with typed handles on every capability
#[derive(Clone, Default)]
pub struct FakeHost {
    pub store: Arc<RecordingStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub http: Arc<ScriptedHttpClient>,
    pub network: Arc<StaticNetwork>,
    pub outbound: Arc<RecordingOutbound>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, http: ScriptedHttpClient) -> Self {
        self.http = Arc::new(http);
        self
    }

    pub fn with_network(self, snapshot: NetworkSnapshot) -> Self {
        self.network.set(snapshot);
        self
    }

    pub fn context(&self) -> HostContext {
        HostContext::new(
            self.store.clone(),
            self.notifier.clone(),
            self.http.clone(),
            self.network.clone(),
            self.outbound.clone(),
        )
    }
}
