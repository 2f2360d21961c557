//! Events posted from page-side handlers to the host page.

use serde::Serialize;
use serde_json::Value;

pub const SUBMISSION_DATA: &str = "SUBMISSION_DATA";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub submission_id: Option<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub provider: &'static str,
    pub data: SubmissionSummary,
    /// Unix millis.
    pub timestamp: u64,
}

/// Sink for page events; in the browser this is `window.postMessage`.
pub trait PageEvents: Send + Sync {
    fn emit(&self, event: PageEvent);
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEvents;

impl PageEvents for LogEvents {
    fn emit(&self, event: PageEvent) {
        log::info!(
            "{} from {}: submission {} ({})",
            event.kind,
            event.provider,
            event.data.submission_id.as_deref().unwrap_or("?"),
            event.data.status.as_deref().unwrap_or("unknown status"),
        );
    }
}
