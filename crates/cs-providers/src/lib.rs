//! CodeSync site providers.
//!
//! Handler classes for LeetCode and HackerRank on both sides of the bridge,
//! the normalized [`Submission`] model, and the sync pipeline that turns an
//! accepted submission into repository files.
//!
//! Page-side classes only declare patterns and are always built. The worker
//! side (remote classes, cache, sync) sits behind the `worker` feature, which
//! pulls in the async runtime.

pub mod events;
pub mod hackerrank;
pub mod leetcode;
pub mod site;
pub mod solved;
pub mod submission;
#[cfg(feature = "worker")]
pub mod sync;

use std::sync::Arc;

use cs_core::PatternRegistry;

pub use events::{LogEvents, PageEvent, PageEvents, SubmissionSummary};
pub use site::Site;
pub use solved::{LastSolved, SolvedEntry, SolvedLedger, SolvedRecord};
pub use submission::{Language, Question, Submission, SubmissionError};
#[cfg(feature = "worker")]
pub use sync::{SubmissionSync, SyncConfig, SyncOutcome};

/// Bind every page-side handler class. Returns the number of bound entries.
pub fn bind_page_handlers(registry: &PatternRegistry, events: Arc<dyn PageEvents>) -> usize {
    registry.bind(Arc::new(leetcode::LeetCodeApiHandlers::new(events)))
        + registry.bind(Arc::new(hackerrank::HackerRankApiHandlers))
}

/// Handler table for the worker side of the bridge.
#[cfg(feature = "worker")]
pub fn worker_table(
    cache: Arc<cs_core::SubmissionCache<Submission>>,
    sync: Arc<SubmissionSync>,
) -> cs_core::bridge::HandlerTable {
    let mut table = cs_core::bridge::HandlerTable::new();
    table.register(Arc::new(leetcode::LeetCodeWorker::new(cache, Arc::clone(&sync))));
    table.register(Arc::new(hackerrank::HackerRankWorker::new(sync)));
    table
}
