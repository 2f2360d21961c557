//! HackerRank handlers.
//!
//! The page only declares the submission-result endpoint; the worker
//! formats the result `model` into a [`Submission`](crate::submission::Submission)
//! and syncs it.

pub mod format;
pub mod page;

#[cfg(feature = "worker")]
pub mod worker;

pub const CLASS_ALIAS: &str = "HackerRankApiHandlers";

pub use page::HackerRankApiHandlers;
#[cfg(feature = "worker")]
pub use worker::HackerRankWorker;
