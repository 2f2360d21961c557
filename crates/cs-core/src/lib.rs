//! CodeSync Core Library
//!
//! This crate provides the interception and dispatch engine for CodeSync.
//! It watches HTTP exchanges made by a coding-practice site, matches them
//! against a table of interest patterns and routes matched traffic to handlers
//! that run either in the capturing context or, through the bridge, in the
//! extension's background worker.
//!
//! # Architecture
//!
//! Handler classes declare their patterns once through [`HandlerClass::declare`].
//! Binding an instance promotes those declarations into the [`PatternRegistry`].
//! The [`HttpInterceptor`] sits in front of an [`HttpClient`] and asks the
//! registry whether a URL is interesting before it does any body work, so
//! unrelated traffic pays one lookup and nothing else.
//!
//! # Modules
//!
//! - `url`: allocation-free URL slicing and query parsing
//! - `pattern`: substring / regex URL patterns
//! - `context`: request and response snapshots
//! - `binding`: handler classes, declarations and dispatch modes
//! - `registry`: the pattern registry and dispatch loop
//! - `interceptor`: middleware in front of the HTTP client
//! - `bridge`: cross-context envelopes; channel port, relay, receiver and
//!   client under the `runtime` feature
//! - `cache`: TTL submission cache (`runtime` feature)
//! - `settings`: per-site settings snapshot
//! - `upload`: the content-upload collaborator interface

pub mod binding;
pub mod bridge;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod pattern;
pub mod registry;
pub mod settings;
pub mod upload;
pub mod url;

#[cfg(feature = "runtime")]
pub mod cache;

use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future used at trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export commonly used types
pub use binding::{DispatchMode, HandlerClass, HandlerId, RemoteTransport};
pub use bridge::message::{BridgeMessage, BridgeReply, ReplyStatus};
pub use context::{Exchange, RawBody, RequestContext, ResponseContext};
pub use error::{BridgeError, HandlerError, NetworkError};
pub use interceptor::{HttpClient, HttpInterceptor, HttpRequest, HttpResponse};
pub use pattern::UrlPattern;
pub use registry::PatternRegistry;
pub use settings::{SettingsSnapshot, SiteSettings};
pub use upload::{ContentUploader, UploadError};

#[cfg(feature = "runtime")]
pub use cache::SubmissionCache;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
