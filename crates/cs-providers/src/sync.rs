//! Submission sync pipeline.
//!
//! Turns an accepted, fresh submission into repository files:
//!
//! ```text
//! <subdirectory>/<frontendId>-<slug>/README.md
//! <subdirectory>/<frontendId>-<slug>/Notes.md      (only with notes)
//! <subdirectory>/<frontendId>-<slug>/<slug><ext>
//! ```
//!
//! The same submission can arrive through several signals (the submit call,
//! the detail query, a retried bridge message). A short-lived record of what
//! was synced keeps uploads to one per `(site, slug, timestamp)`. Every
//! successful sync is also entered in the [`SolvedLedger`].

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use cs_core::bridge::HandlerReturn;
use cs_core::{ContentUploader, HandlerError, SettingsSnapshot, SubmissionCache, UploadError};
use serde::Serialize;

use crate::site::Site;
use crate::solved::{SolvedLedger, SolvedRecord};
use crate::submission::{Submission, DEFAULT_FRESHNESS_WINDOW};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub freshness_window: Duration,
    /// How long a synced submission is remembered for de-duplication.
    pub dedupe_ttl: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            dedupe_ttl: cs_core::cache::DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced { path: String, files_written: usize },
    Rejected { status: String },
    Stale { age_secs: u64 },
    Duplicate,
    SiteDisabled,
    UnsupportedLanguage { language: String },
    NotConfigured { reason: String },
    Failed { error: String },
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

pub struct SubmissionSync {
    uploader: Arc<dyn ContentUploader>,
    settings: RwLock<SettingsSnapshot>,
    synced: SubmissionCache<()>,
    solved: SolvedLedger,
    config: SyncConfig,
}

impl SubmissionSync {
    pub fn new(uploader: Arc<dyn ContentUploader>, settings: SettingsSnapshot, config: SyncConfig) -> Self {
        Self {
            uploader,
            settings: RwLock::new(settings),
            synced: SubmissionCache::new(),
            solved: SolvedLedger::new(),
            config,
        }
    }

    /// Start from a solved record loaded from storage.
    pub fn with_solved(mut self, record: SolvedRecord) -> Self {
        self.solved = SolvedLedger::with_record(record);
        self
    }

    pub fn solved(&self) -> &SolvedLedger {
        &self.solved
    }

    pub fn update_settings(&self, settings: SettingsSnapshot) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn settings(&self) -> SettingsSnapshot {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn sync(&self, site: Site, submission: &Submission) -> SyncOutcome {
        self.sync_at(site, submission, cs_core::unix_millis() / 1000).await
    }

    /// Run the pipeline with `now` (unix seconds) as the current time.
    pub async fn sync_at(&self, site: Site, submission: &Submission, now: u64) -> SyncOutcome {
        let outcome = self.run(site, submission, now).await;
        match &outcome {
            SyncOutcome::Synced { path, files_written } => {
                log::info!("Synced {} {} to {} ({} file(s))", site, submission.slug(), path, files_written)
            }
            SyncOutcome::Failed { error } => log::error!("Sync of {} {} failed: {}", site, submission.slug(), error),
            other => log::debug!("Skipped {} {}: {:?}", site, submission.slug(), other),
        }
        outcome
    }

    /// Handler return that syncs `submission` and replies with the outcome.
    pub fn deferred(self: &Arc<Self>, site: Site, submission: Submission) -> HandlerReturn {
        let sync = Arc::clone(self);
        HandlerReturn::deferred(async move {
            let outcome = sync.sync(site, &submission).await;
            serde_json::to_value(outcome)
                .map(Some)
                .map_err(|e| HandlerError::other(e.to_string()))
        })
    }

    async fn run(&self, site: Site, submission: &Submission, now: u64) -> SyncOutcome {
        if !submission.is_accepted() {
            return SyncOutcome::Rejected { status: submission.status_name() };
        }
        if !submission.is_recent(now, self.config.freshness_window) {
            return SyncOutcome::Stale { age_secs: now.saturating_sub(submission.timestamp) };
        }

        let settings = self.settings();
        if !settings.is_enabled(site.name()) {
            return SyncOutcome::SiteDisabled;
        }
        let Some(extension) = submission.extension() else {
            return SyncOutcome::UnsupportedLanguage { language: submission.lang.display().to_string() };
        };

        let key = format!("{}:{}:{}", site, submission.slug(), submission.timestamp);
        if !self.synced.set_if_absent(key.clone(), (), self.config.dedupe_ttl) {
            return SyncOutcome::Duplicate;
        }

        let path = format!(
            "{}/{}-{}",
            settings.subdirectory_for(site.name()),
            submission.frontend_id(),
            submission.slug()
        );
        match self.upload_files(site, submission, &path, extension, settings.overwrite_existing).await {
            Ok(files_written) => {
                self.solved.record(site, submission, cs_core::unix_millis());
                SyncOutcome::Synced { path, files_written }
            }
            Err(e) => {
                // Let a later signal for the same submission try again.
                self.synced.remove(&key);
                match e {
                    UploadError::NotConfigured(reason) => SyncOutcome::NotConfigured { reason },
                    other => SyncOutcome::Failed { error: other.to_string() },
                }
            }
        }
    }

    async fn upload_files(
        &self,
        site: Site,
        submission: &Submission,
        path: &str,
        extension: &str,
        overwrite: bool,
    ) -> Result<usize, UploadError> {
        let title = &submission.question.title;
        let mut written = 0;

        let readme = render_readme(site, submission);
        let message = format!("Added README.md file for {}", title);
        written += self.uploader.upload(path, "README.md", readme.as_bytes(), &message, true).await? as usize;

        if !submission.notes.trim().is_empty() {
            let notes = format!("<h2>{} Notes</h2><hr>{}", title, submission.notes);
            let message = format!("Added Notes.md file for {}", title);
            written += self.uploader.upload(path, "Notes.md", notes.as_bytes(), &message, true).await? as usize;
        }

        let filename = format!("{}{}", submission.slug(), extension);
        let message = commit_message(site, submission);
        written += self
            .uploader
            .upload(path, &filename, submission.code.as_bytes(), &message, overwrite)
            .await? as usize;

        Ok(written)
    }
}

fn difficulty_color(difficulty: &str) -> &'static str {
    match difficulty {
        "Easy" => "brightgreen",
        "Medium" => "orange",
        "Hard" => "red",
        _ => "lightgrey",
    }
}

pub fn render_readme(site: Site, submission: &Submission) -> String {
    let question = &submission.question;
    let difficulty = if question.difficulty.is_empty() { "Unknown" } else { &question.difficulty };
    format!(
        "<h2><a href=\"{}\">{}</a></h2> <img src='https://img.shields.io/badge/Difficulty-{}-{}' alt='Difficulty: {}' /><hr>{}",
        site.problem_url(submission.slug()),
        question.title,
        difficulty,
        difficulty_color(difficulty),
        difficulty,
        question.content
    )
}

fn percentile(p: Option<f64>) -> String {
    p.map(|p| format!("{:.2}%", p)).unwrap_or_else(|| "N/A".to_string())
}

pub fn commit_message(site: Site, submission: &Submission) -> String {
    format!(
        "Time: {} ({}) | Memory: {} ({}) - {} via CodeSync",
        submission.runtime_display,
        percentile(submission.runtime_percentile),
        submission.memory_display,
        percentile(submission.memory_percentile),
        site.display_name()
    )
}
