use std::sync::{Mutex, PoisonError};

use cs_core::{BoxFuture, ContentUploader, UploadError};

/// Logs what would be committed and remembers it.
#[derive(Default)]
pub struct DryRunUploader {
    written: Mutex<Vec<String>>,
}

impl DryRunUploader {
    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ContentUploader for DryRunUploader {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        filename: &'a str,
        content: &'a [u8],
        commit_message: &'a str,
        overwrite: bool,
    ) -> BoxFuture<'a, Result<bool, UploadError>> {
        Box::pin(async move {
            let file = format!("{}/{}", path, filename);
            log::info!(
                "[dry-run] {} ({} bytes, overwrite={}): {}",
                file,
                content.len(),
                overwrite,
                commit_message
            );
            self.written.lock().unwrap_or_else(PoisonError::into_inner).push(file);
            Ok(true)
        })
    }
}
