//! Content upload collaborator.
//!
//! The engine never talks to a repository host directly; it hands finished
//! files to a [`ContentUploader`].

use std::sync::Arc;

use crate::BoxFuture;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Uploader not configured: {0}")]
    NotConfigured(String),
    #[error("Upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Upload transport failed: {0}")]
    Transport(String),
}

pub trait ContentUploader: Send + Sync {
    /// Write `content` to `<path>/<filename>`.
    ///
    /// Returns `false` when the file already exists and `overwrite` is off.
    fn upload<'a>(
        &'a self,
        path: &'a str,
        filename: &'a str,
        content: &'a [u8],
        commit_message: &'a str,
        overwrite: bool,
    ) -> BoxFuture<'a, Result<bool, UploadError>>;
}

impl<T: ContentUploader + ?Sized> ContentUploader for Arc<T> {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        filename: &'a str,
        content: &'a [u8],
        commit_message: &'a str,
        overwrite: bool,
    ) -> BoxFuture<'a, Result<bool, UploadError>> {
        (**self).upload(path, filename, content, commit_message, overwrite)
    }
}
