//! HTTP interception middleware.
//!
//! [`HttpInterceptor`] wraps an [`HttpClient`] and exposes the two request
//! primitives page code uses: a one-shot `fetch` and an `open` / `send` pair.
//! While installed, every completed exchange whose URL matches a bound
//! registry entry is snapshotted and dispatched. Callers always get the
//! client's response back unmodified; network failures propagate as-is.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::{HeaderMap, RawBody, RequestContext, ResponseContext};
use crate::error::NetworkError;
use crate::registry::PatternRegistry;
use crate::BoxFuture;

// =============================================================================
// Client seam
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RawBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: HeaderMap::new(),
            body: RawBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: RawBody) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: RawBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: RawBody) -> Self {
        Self { status, headers: HeaderMap::new(), body }
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let data = serde_json::to_vec(&value).unwrap_or_default();
        Self {
            status,
            headers,
            body: RawBody::Bytes { content_type: Some("application/json".to_string()), data },
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network primitive being wrapped.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>> {
        (**self).execute(request)
    }
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    passed_through: AtomicU64,
    skipped_status: AtomicU64,
    contexts_built: AtomicU64,
    handlers_matched: AtomicU64,
}

/// Point-in-time view of interceptor activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterceptorStats {
    /// Exchanges that no bound pattern matched, or seen while stopped.
    pub passed_through: u64,
    /// Matched exchanges dropped because the status was not 2xx.
    pub skipped_status: u64,
    pub contexts_built: u64,
    pub handlers_matched: u64,
}

// =============================================================================
// Interceptor
// =============================================================================

/// Request pieces kept for a matched exchange until its response arrives.
struct Capture {
    method: String,
    url: String,
    headers: HeaderMap,
    body: RawBody,
}

pub struct HttpInterceptor<C> {
    client: C,
    registry: Arc<PatternRegistry>,
    active: AtomicBool,
    counters: Counters,
}

impl<C: HttpClient> HttpInterceptor<C> {
    pub fn new(client: C, registry: Arc<PatternRegistry>) -> Self {
        Self {
            client,
            registry,
            active: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Install interception. Returns `false` if it was already installed.
    pub fn start(&self) -> bool {
        let changed = !self.active.swap(true, Ordering::SeqCst);
        if changed {
            log::info!("HTTP interception started");
        }
        changed
    }

    /// Restore pass-through behavior. Returns `false` if it was not installed.
    pub fn stop(&self) -> bool {
        let changed = self.active.swap(false, Ordering::SeqCst);
        if changed {
            log::info!("HTTP interception stopped");
        }
        changed
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn stats(&self) -> InterceptorStats {
        InterceptorStats {
            passed_through: self.counters.passed_through.load(Ordering::Relaxed),
            skipped_status: self.counters.skipped_status.load(Ordering::Relaxed),
            contexts_built: self.counters.contexts_built.load(Ordering::Relaxed),
            handlers_matched: self.counters.handlers_matched.load(Ordering::Relaxed),
        }
    }

    /// One-shot request primitive.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let capture = self.begin(&request.url).then(|| Capture {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });

        let response = self.client.execute(request).await?;
        if let Some(capture) = capture {
            self.complete(capture, &response);
        }
        Ok(response)
    }

    /// Start an `open` / `send` style request.
    pub fn open(&self, method: &str, url: &str) -> PendingRequest<'_, C> {
        PendingRequest {
            interceptor: self,
            method: method.to_string(),
            url: url.to_string(),
            headers: HeaderMap::new(),
        }
    }

    /// Fast path: one registry lookup, no allocation for unmatched traffic.
    #[inline]
    fn begin(&self, url: &str) -> bool {
        if self.is_active() && self.registry.matches(url) {
            return true;
        }
        self.counters.passed_through.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn complete(&self, capture: Capture, response: &HttpResponse) {
        if !response.is_success() {
            log::debug!("Skipping {} {}: status {}", capture.method, capture.url, response.status);
            self.counters.skipped_status.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let request_context = RequestContext::new(&capture.method, &capture.url, capture.headers, &capture.body);
        let response_context = ResponseContext::new(response.status, response.headers.clone(), &response.body);
        self.counters.contexts_built.fetch_add(1, Ordering::Relaxed);

        let report = self.registry.dispatch(request_context, response_context);
        self.counters
            .handlers_matched
            .fetch_add(report.matched as u64, Ordering::Relaxed);
    }
}

/// An opened request awaiting `send`.
pub struct PendingRequest<'a, C> {
    interceptor: &'a HttpInterceptor<C>,
    method: String,
    url: String,
    headers: HeaderMap,
}

impl<'a, C: HttpClient> PendingRequest<'a, C> {
    pub fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub async fn send(self, body: RawBody) -> Result<HttpResponse, NetworkError> {
        let Self { interceptor, method, url, headers } = self;
        interceptor.fetch(HttpRequest { method, url, headers, body }).await
    }
}
