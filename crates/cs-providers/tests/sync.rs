use std::sync::{Arc, Mutex};
use std::time::Duration;

use cs_core::{BoxFuture, ContentUploader, SettingsSnapshot, UploadError};
use cs_providers::{Language, Question, Site, SolvedRecord, Submission, SubmissionSync, SyncConfig, SyncOutcome};

#[derive(Debug, Clone, PartialEq)]
struct Upload {
    file: String,
    message: String,
    overwrite: bool,
}

#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<Upload>>,
    fail_with: Mutex<Option<UploadError>>,
}

impl RecordingUploader {
    fn files(&self) -> Vec<String> {
        self.uploads.lock().unwrap().iter().map(|u| u.file.clone()).collect()
    }
}

impl ContentUploader for RecordingUploader {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        filename: &'a str,
        _content: &'a [u8],
        commit_message: &'a str,
        overwrite: bool,
    ) -> BoxFuture<'a, Result<bool, UploadError>> {
        Box::pin(async move {
            if let Some(e) = self.fail_with.lock().unwrap().take() {
                return Err(e);
            }
            self.uploads.lock().unwrap().push(Upload {
                file: format!("{}/{}", path, filename),
                message: commit_message.to_string(),
                overwrite,
            });
            Ok(true)
        })
    }
}

const NOW: u64 = 1_718_000_000;

fn submission(timestamp: u64) -> Submission {
    Submission {
        code: "class Solution: pass".into(),
        lang: Language::new("python3", "Python3"),
        status_code: 10,
        timestamp,
        runtime_display: "52 ms".into(),
        runtime_percentile: Some(91.53),
        memory_display: "17.4 MB".into(),
        memory_percentile: Some(63.2),
        question: Question {
            question_id: "1".into(),
            question_frontend_id: "1".into(),
            title: "Two Sum".into(),
            title_slug: "two-sum".into(),
            content: "<p>Given an array...</p>".into(),
            difficulty: "Easy".into(),
        },
        notes: String::new(),
    }
}

fn pipeline(settings: SettingsSnapshot) -> (SubmissionSync, Arc<RecordingUploader>) {
    let uploader = Arc::new(RecordingUploader::default());
    let sync = SubmissionSync::new(uploader.clone(), settings, SyncConfig::default());
    (sync, uploader)
}

#[tokio::test]
async fn test_stale_submission_not_uploaded() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());

    let outcome = sync.sync_at(Site::LeetCode, &submission(NOW - 300), NOW).await;
    assert_eq!(outcome, SyncOutcome::Stale { age_secs: 300 });
    assert!(uploader.files().is_empty());

    let outcome = sync.sync_at(Site::LeetCode, &submission(NOW - 10), NOW).await;
    assert!(outcome.is_synced());
    assert_eq!(
        uploader.files(),
        vec!["leetcode/1-two-sum/README.md", "leetcode/1-two-sum/two-sum.py"]
    );
}

#[tokio::test]
async fn test_synced_outcome_and_commit_messages() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());
    let mut s = submission(NOW);
    s.notes = "Use a hash map.".into();

    let outcome = sync.sync_at(Site::LeetCode, &s, NOW).await;
    assert_eq!(
        outcome,
        SyncOutcome::Synced { path: "leetcode/1-two-sum".into(), files_written: 3 }
    );

    let uploads = uploader.uploads.lock().unwrap();
    assert_eq!(uploads[0].message, "Added README.md file for Two Sum");
    assert_eq!(uploads[1].file, "leetcode/1-two-sum/Notes.md");
    assert_eq!(uploads[1].message, "Added Notes.md file for Two Sum");
    assert_eq!(
        uploads[2].message,
        "Time: 52 ms (91.53%) | Memory: 17.4 MB (63.20%) - LeetCode via CodeSync"
    );
}

#[tokio::test]
async fn test_same_submission_synced_once() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());
    let s = submission(NOW);

    assert!(sync.sync_at(Site::LeetCode, &s, NOW).await.is_synced());
    assert_eq!(sync.sync_at(Site::LeetCode, &s, NOW + 1).await, SyncOutcome::Duplicate);
    assert_eq!(uploader.files().len(), 2);

    // A resubmission has a new timestamp.
    assert!(sync.sync_at(Site::LeetCode, &submission(NOW + 30), NOW + 31).await.is_synced());
}

#[tokio::test]
async fn test_failed_upload_can_retry() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());
    *uploader.fail_with.lock().unwrap() = Some(UploadError::Transport("connection reset".into()));

    let outcome = sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await;
    assert!(matches!(outcome, SyncOutcome::Failed { ref error } if error.contains("connection reset")));

    assert!(sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await.is_synced());
}

#[tokio::test]
async fn test_unconfigured_uploader() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());
    *uploader.fail_with.lock().unwrap() = Some(UploadError::NotConfigured("missing token".into()));

    let outcome = sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await;
    assert_eq!(outcome, SyncOutcome::NotConfigured { reason: "missing token".into() });
}

#[tokio::test]
async fn test_rejected_and_unsupported() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());

    let mut wrong = submission(NOW);
    wrong.status_code = 14;
    assert_eq!(
        sync.sync_at(Site::LeetCode, &wrong, NOW).await,
        SyncOutcome::Rejected { status: "Time Limit Exceeded".into() }
    );

    let mut odd = submission(NOW);
    odd.lang = Language::new("racket", "Racket");
    assert_eq!(
        sync.sync_at(Site::LeetCode, &odd, NOW).await,
        SyncOutcome::UnsupportedLanguage { language: "Racket".into() }
    );
    assert!(uploader.files().is_empty());
}

#[tokio::test]
async fn test_settings_drive_path_and_overwrite() {
    let settings = SettingsSnapshot::from_json(
        r#"{
            "provider_settings": {"hackerrank": {"enabled": false}},
            "github_leetsync_subdirectory": "solutions",
            "overwrite_existing": false
        }"#,
    )
    .unwrap();
    let (sync, uploader) = pipeline(settings);

    assert_eq!(sync.sync_at(Site::HackerRank, &submission(NOW), NOW).await, SyncOutcome::SiteDisabled);

    let outcome = sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await;
    assert_eq!(
        outcome,
        SyncOutcome::Synced { path: "solutions/1-two-sum".into(), files_written: 2 }
    );
    let uploads = uploader.uploads.lock().unwrap();
    assert!(uploads[0].overwrite);
    assert!(!uploads[1].overwrite);
}

#[tokio::test]
async fn test_update_settings_applies_to_next_sync() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());
    let mut settings = SettingsSnapshot::default();
    settings.sites.insert(
        "leetcode".into(),
        cs_core::SiteSettings { enabled: true, subdirectory: "lc".into() },
    );
    sync.update_settings(settings);

    assert!(sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await.is_synced());
    assert_eq!(uploader.files()[0], "lc/1-two-sum/README.md");
}

#[tokio::test]
async fn test_freshness_window_is_configurable() {
    let uploader = Arc::new(RecordingUploader::default());
    let config = SyncConfig { freshness_window: Duration::from_secs(600), ..SyncConfig::default() };
    let sync = SubmissionSync::new(uploader.clone(), SettingsSnapshot::default(), config);

    assert!(sync.sync_at(Site::LeetCode, &submission(NOW - 300), NOW).await.is_synced());
}

#[tokio::test]
async fn test_only_uploads_enter_solved_ledger() {
    let (sync, uploader) = pipeline(SettingsSnapshot::default());

    assert!(matches!(
        sync.sync_at(Site::LeetCode, &submission(NOW - 300), NOW).await,
        SyncOutcome::Stale { .. }
    ));
    assert!(sync.solved().is_empty());

    *uploader.fail_with.lock().unwrap() = Some(UploadError::Transport("connection reset".into()));
    assert!(matches!(
        sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await,
        SyncOutcome::Failed { .. }
    ));
    assert!(sync.solved().is_empty());

    assert!(sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await.is_synced());
    let first = sync.solved().last_solved().unwrap();
    assert_eq!(first.slug, "two-sum");

    assert_eq!(sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await, SyncOutcome::Duplicate);
    assert_eq!(sync.solved().last_solved(), Some(first));

    let record = sync.solved().snapshot();
    assert_eq!(record.problems_solved.len(), 1);
    let entry = &record.problems_solved["two-sum"];
    assert_eq!(entry.question.question_id, "1");
    assert_eq!(entry.question.difficulty, "Easy");
    assert_eq!(entry.site, Site::LeetCode);
}

#[tokio::test]
async fn test_solved_ledger_seeded_from_storage() {
    let uploader = Arc::new(RecordingUploader::default());
    let stored: SolvedRecord = serde_json::from_str(
        r#"{"lastSolved": {"slug": "valid-anagram", "timestamp": 7},
            "problemsSolved": {"valid-anagram": {
                "question": {"difficulty": "Easy", "questionId": "242"},
                "site": "leetcode",
                "timestamp": 7
            }}}"#,
    )
    .unwrap();
    let sync = SubmissionSync::new(uploader, SettingsSnapshot::default(), SyncConfig::default()).with_solved(stored);

    assert!(sync.sync_at(Site::LeetCode, &submission(NOW), NOW).await.is_synced());
    let record = sync.solved().snapshot();
    assert_eq!(record.problems_solved.len(), 2);
    assert_eq!(record.last_solved.unwrap().slug, "two-sum");
}
