use crate::admin::Metrics;
use crate::error::{RewriteError, RewriteStage};
use crate::rewriter::{InterceptedEvent, ResponseRewriter, RewriteOutcome, Unchanged};
use hudsucker::{
    hyper::{
        body::HttpBody,
        header::{HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH},
        Body, Request, Response,
    },
    HttpContext, HttpHandler, RequestOrResponse,
};
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Proxy handler that feeds responses from the ad endpoints through the
/// [`ResponseRewriter`]. Everything else passes through untouched.
///
/// hudsucker clones the handler for every request, so the URL remembered in
/// `handle_request` is the one the following `handle_response` belongs to.
#[derive(Clone)]
pub struct RewriteHandler {
    rewriter: Arc<ResponseRewriter>,
    metrics: Arc<Metrics>,
    pending: Option<PendingRequest>,
}

#[derive(Clone, Debug)]
struct PendingRequest {
    id: String,
    url: String,
}

impl RewriteHandler {
    pub fn new(rewriter: Arc<ResponseRewriter>, metrics: Arc<Metrics>) -> Self {
        Self {
            rewriter,
            metrics,
            pending: None,
        }
    }
}

/// Read the whole body, rewrite it if it belongs to an ad endpoint and
/// rebuild the response.
///
/// Compressed bodies are passed through unchanged since the rewriter only
/// understands plain JSON text.
pub async fn rewrite_response(
    rewriter: &ResponseRewriter,
    metrics: &Metrics,
    url: &str,
    response: Response<Body>,
) -> Response<Body> {
    let (mut parts, mut body) = response.into_parts();

    let encoded = parts
        .headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|encoding| !encoding.is_empty() && !encoding.eq_ignore_ascii_case("identity"))
        .unwrap_or(false);
    if encoded {
        metrics.encoded_passthrough.fetch_add(1, Ordering::Relaxed);
        warn!(url, "Encoded response body, passing through unchanged");
        return Response::from_parts(parts, body);
    }

    let mut data = Vec::new();
    while let Some(chunk) = body.data().await {
        match chunk {
            Ok(chunk) => data.extend_from_slice(&chunk),
            Err(e) => {
                metrics.body_read_errors.fetch_add(1, Ordering::Relaxed);
                warn!(url, "Stream error while reading body: {}", e);
                parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
                return Response::from_parts(parts, Body::from(data));
            }
        }
    }

    let outcome = match std::str::from_utf8(&data) {
        Ok(text) => rewriter.rewrite(&InterceptedEvent::response(url, text)),
        Err(e) => {
            let err = RewriteError::new(
                rewriter
                    .match_endpoint(url)
                    .map(|endpoint| endpoint.name())
                    .unwrap_or("unknown"),
                RewriteStage::Parse,
                format!("body is not valid UTF-8: {}", e),
            );
            error!(url, stage = %err.stage, "{}", err);
            RewriteOutcome::Unchanged(Unchanged::Failed(err))
        }
    };

    match outcome {
        RewriteOutcome::Rewritten { body: rewritten, .. } => {
            metrics.rewritten.fetch_add(1, Ordering::Relaxed);
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
            Response::from_parts(parts, Body::from(rewritten))
        }
        RewriteOutcome::Unchanged(reason) => {
            if let Unchanged::Failed(_) = reason {
                metrics.rewrite_failures.fetch_add(1, Ordering::Relaxed);
            }
            Response::from_parts(parts, Body::from(data))
        }
    }
}

impl RewriteHandler {
    /// Remember ad-endpoint requests and ask for an identity-encoded body
    fn on_request(&mut self, mut req: Request<Body>) -> Request<Body> {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let url = req.uri().to_string();
        if self.rewriter.match_endpoint(&url).is_none() {
            self.pending = None;
            return req;
        }

        req.headers_mut().remove(ACCEPT_ENCODING);

        let id = Uuid::new_v4().to_string();
        debug!("Request [{}] {} {} (ad endpoint)", id, req.method(), url);
        self.pending = Some(PendingRequest { id, url });
        req
    }

    async fn on_response(&mut self, res: Response<Body>) -> Response<Body> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return res,
        };

        self.metrics.matched_responses.fetch_add(1, Ordering::Relaxed);
        debug!("Response [{}] status: {}", pending.id, res.status());
        rewrite_response(&self.rewriter, &self.metrics, &pending.url, res).await
    }
}

#[async_trait::async_trait]
impl HttpHandler for RewriteHandler {
    async fn handle_request(&mut self, _ctx: &HttpContext, req: Request<Body>) -> RequestOrResponse {
        RequestOrResponse::Request(self.on_request(req))
    }

    async fn handle_response(&mut self, _ctx: &HttpContext, res: Response<Body>) -> Response<Body> {
        self.on_response(res).await
    }
}
