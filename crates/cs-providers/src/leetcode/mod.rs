//! LeetCode handlers.
//!
//! The page class and the worker class share one alias, so handler ids
//! declared on the page resolve to worker methods across the bridge.

pub mod page;

#[cfg(feature = "worker")]
pub mod graphql;
#[cfg(feature = "worker")]
pub mod worker;

pub const CLASS_ALIAS: &str = "LeetCodeApiHandlers";

pub use page::LeetCodeApiHandlers;
#[cfg(feature = "worker")]
pub use worker::LeetCodeWorker;
