//! Replay of recorded exchanges through the full page -> worker path.
//!
//! A replay file is either an array of exchanges or `{"exchanges": [...]}`:
//!
//! ```json
//! [{
//!   "method": "POST",
//!   "url": "https://leetcode.com/graphql/",
//!   "requestBody": {"operationName": "submissionDetails"},
//!   "status": 200,
//!   "responseBody": {"data": {"submissionDetails": {}}}
//! }]
//! ```

use std::sync::Arc;
use std::time::Duration;

use cs_core::bridge::{channel, spawn_relay, BridgeClient, BridgeConfig, BridgeReceiver};
use cs_core::context::HeaderMap;
use cs_core::interceptor::{HttpResponse, InterceptorStats};
use cs_core::{
    BoxFuture, ContentUploader, HttpClient, HttpInterceptor, HttpRequest, NetworkError, PatternRegistry,
    RawBody, SettingsSnapshot, SubmissionCache,
};
use cs_providers::{bind_page_handlers, worker_table, LogEvents, SolvedRecord, SubmissionSync, SyncConfig};
use serde::Deserialize;
use serde_json::Value;

const BRIDGE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedExchange {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub request_headers: HeaderMap,
    #[serde(default)]
    pub request_body: Option<Value>,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub response_headers: HeaderMap,
    #[serde(default)]
    pub response_body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReplayFile {
    Bare(Vec<RecordedExchange>),
    Wrapped { exchanges: Vec<RecordedExchange> },
}

impl ReplayFile {
    pub fn into_exchanges(self) -> Vec<RecordedExchange> {
        match self {
            Self::Bare(exchanges) | Self::Wrapped { exchanges } => exchanges,
        }
    }
}

fn body(value: Option<Value>) -> RawBody {
    match value {
        None | Some(Value::Null) => RawBody::Empty,
        Some(Value::String(text)) => RawBody::Text(text),
        Some(value) => RawBody::Json(value),
    }
}

/// Serves each request from the recording, in order.
struct Recording {
    exchanges: Vec<RecordedExchange>,
}

impl HttpClient for Recording {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>> {
        let recorded = self
            .exchanges
            .iter()
            .find(|e| e.url == request.url && e.method.eq_ignore_ascii_case(&request.method));
        let result = match recorded {
            Some(recorded) => Ok(HttpResponse {
                status: recorded.status,
                headers: recorded.response_headers.clone(),
                body: body(recorded.response_body.clone()),
            }),
            None => Err(NetworkError(format!("No recorded response for {} {}", request.method, request.url))),
        };
        Box::pin(async move { result })
    }
}

pub struct ReplayOptions {
    pub settings: SettingsSnapshot,
    pub sync: SyncConfig,
    pub bridge: BridgeConfig,
}

pub struct ReplayReport {
    pub stats: InterceptorStats,
    /// Problems synced during the replay.
    pub solved: SolvedRecord,
}

/// Run every exchange through a page interceptor bridged to an in-process
/// worker. Returns once every bridged message has been answered.
pub async fn run(
    exchanges: Vec<RecordedExchange>,
    uploader: Arc<dyn ContentUploader>,
    options: ReplayOptions,
) -> Result<ReplayReport, String> {
    let sync = Arc::new(SubmissionSync::new(uploader, options.settings, options.sync));
    let table = worker_table(Arc::new(SubmissionCache::new()), Arc::clone(&sync));

    let (worker_tx, worker_inbox) = channel(BRIDGE_CAPACITY);
    let (page_tx, page_inbox) = channel(BRIDGE_CAPACITY);
    let receiver = BridgeReceiver::new(table).spawn(worker_inbox);
    let relay = spawn_relay(page_inbox, worker_tx);
    let (client, outbox) = BridgeClient::spawn(page_tx, options.bridge);

    let registry = Arc::new(PatternRegistry::new());
    registry.set_remote_transport(Arc::new(client));
    bind_page_handlers(&registry, Arc::new(LogEvents));

    let requests: Vec<HttpRequest> = exchanges
        .iter()
        .map(|e| HttpRequest {
            method: e.method.clone(),
            url: e.url.clone(),
            headers: e.request_headers.clone(),
            body: body(e.request_body.clone()),
        })
        .collect();

    let interceptor = HttpInterceptor::new(Recording { exchanges }, Arc::clone(&registry));
    interceptor.start();
    for request in requests {
        let url = request.url.clone();
        if let Err(e) = interceptor.fetch(request).await {
            log::warn!("{}: {}", url, e);
        }
    }
    let stats = interceptor.stats();

    // Dropping the transport closes the outbox once queued messages settle.
    registry.clear_remote_transport();
    outbox.await.map_err(|e| format!("Bridge client task failed: {}", e))?;
    relay.abort();
    receiver.abort();
    Ok(ReplayReport {
        stats,
        solved: sync.solved().snapshot(),
    })
}
