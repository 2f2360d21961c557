//! Normalized submission model shared by every site.
//!
//! Field names follow LeetCode's `submissionDetails` GraphQL shape so that
//! payload can be deserialized directly; other sites build a [`Submission`]
//! by hand.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// LeetCode's status code for an accepted submission.
pub const ACCEPTED: u32 = 10;

/// Submissions older than this are not synced.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Payload has no submissionDetails")]
    MissingDetails,
    #[error("Malformed submission: {0}")]
    Malformed(String),
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub verbose_name: String,
}

impl Language {
    pub fn new(name: impl Into<String>, verbose_name: impl Into<String>) -> Self {
        Self { name: name.into(), verbose_name: verbose_name.into() }
    }

    /// Human-facing name, falling back to the short name.
    pub fn display(&self) -> &str {
        if self.verbose_name.is_empty() {
            &self.name
        } else {
            &self.verbose_name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Question {
    #[serde(deserialize_with = "lenient::string")]
    pub question_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub question_frontend_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title_slug: String,
    #[serde(deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(deserialize_with = "lenient::string")]
    pub difficulty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Submission {
    #[serde(deserialize_with = "lenient::string")]
    pub code: String,
    pub lang: Language,
    #[serde(deserialize_with = "lenient::u32")]
    pub status_code: u32,
    /// Unix seconds.
    #[serde(deserialize_with = "lenient::u64")]
    pub timestamp: u64,
    #[serde(deserialize_with = "lenient::string")]
    pub runtime_display: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub runtime_percentile: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub memory_display: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub memory_percentile: Option<f64>,
    pub question: Question,
    #[serde(deserialize_with = "lenient::string")]
    pub notes: String,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        self.status_code == ACCEPTED
    }

    pub fn status_name(&self) -> String {
        status_name(self.status_code)
    }

    pub fn slug(&self) -> &str {
        &self.question.title_slug
    }

    /// Id used in the upload directory name.
    pub fn frontend_id(&self) -> &str {
        [&self.question.question_frontend_id, &self.question.question_id]
            .into_iter()
            .find(|id| !id.is_empty())
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Source file extension, `None` for unsupported languages.
    pub fn extension(&self) -> Option<&'static str> {
        language_extension(&self.lang.verbose_name).or_else(|| language_extension(&self.lang.name))
    }

    pub fn is_recent(&self, now: u64, window: Duration) -> bool {
        is_recent(self.timestamp, now, window)
    }
}

/// Extract the submission from a `submissionDetails` GraphQL response, with
/// or without the `data` wrapper.
pub fn parse_submission_details(payload: &Value) -> Result<Submission, SubmissionError> {
    let details = payload
        .get("data")
        .and_then(|d| d.get("submissionDetails"))
        .or_else(|| payload.get("submissionDetails"))
        .filter(|d| d.is_object())
        .ok_or(SubmissionError::MissingDetails)?;

    let submission: Submission =
        serde_json::from_value(details.clone()).map_err(|e| SubmissionError::Malformed(e.to_string()))?;
    if submission.slug().is_empty() {
        return Err(SubmissionError::Malformed("question.titleSlug is empty".to_string()));
    }
    Ok(submission)
}

// =============================================================================
// Status / Freshness / Languages
// =============================================================================

pub fn status_name(code: u32) -> String {
    let name = match code {
        10 => "Accepted",
        11 => "Wrong Answer",
        12 => "Memory Limit Exceeded",
        13 => "Output Limit Exceeded",
        14 => "Time Limit Exceeded",
        15 => "Runtime Error",
        16 => "Internal Error",
        20 => "Compile Error",
        21 => "Unknown Error",
        other => return format!("Unknown Status ({})", other),
    };
    name.to_string()
}

/// `true` while less than `window` has passed since `timestamp` (both unix
/// seconds). Timestamps from the future count as recent.
pub fn is_recent(timestamp: u64, now: u64, window: Duration) -> bool {
    now.saturating_sub(timestamp) < window.as_secs()
}

const EXTENSIONS: &[(&str, &str)] = &[
    ("Python", ".py"),
    ("Python3", ".py"),
    ("C++", ".cpp"),
    ("C", ".c"),
    ("Java", ".java"),
    ("C#", ".cs"),
    ("JavaScript", ".js"),
    ("Javascript", ".js"),
    ("Ruby", ".rb"),
    ("Swift", ".swift"),
    ("Go", ".go"),
    ("Kotlin", ".kt"),
    ("Scala", ".scala"),
    ("Rust", ".rs"),
    ("PHP", ".php"),
    ("TypeScript", ".ts"),
    ("MySQL", ".sql"),
    ("MS SQL Server", ".sql"),
    ("Oracle", ".sql"),
    ("PostgreSQL", ".sql"),
    ("C++14", ".cpp"),
    ("C++17", ".cpp"),
    ("C++11", ".cpp"),
    ("C++98", ".cpp"),
    ("C++03", ".cpp"),
    ("C++20", ".cpp"),
    ("C++1z", ".cpp"),
    ("C++1y", ".cpp"),
    ("C++1x", ".cpp"),
    ("C++1a", ".cpp"),
    ("CPP", ".cpp"),
    ("Dart", ".dart"),
    ("Elixir", ".ex"),
];

/// Short language keys as HackerRank reports them.
const SHORT_EXTENSIONS: &[(&str, &str)] = &[
    ("python", ".py"),
    ("python3", ".py"),
    ("pypy3", ".py"),
    ("cpp", ".cpp"),
    ("cpp14", ".cpp"),
    ("cpp20", ".cpp"),
    ("c", ".c"),
    ("java", ".java"),
    ("java8", ".java"),
    ("java15", ".java"),
    ("csharp", ".cs"),
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("ruby", ".rb"),
    ("swift", ".swift"),
    ("go", ".go"),
    ("kotlin", ".kt"),
    ("scala", ".scala"),
    ("rust", ".rs"),
    ("php", ".php"),
    ("mysql", ".sql"),
];

pub fn language_extension(language: &str) -> Option<&'static str> {
    if language.is_empty() {
        return None;
    }
    EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .or_else(|| {
            let lower = language.to_ascii_lowercase();
            SHORT_EXTENSIONS.iter().find(|(name, _)| *name == lower)
        })
        .map(|(_, ext)| *ext)
}

// =============================================================================
// Lenient field decoding
// =============================================================================

/// Site payloads mix numbers, numeric strings and nulls for the same field.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(d)?;
        if let Some(n) = value.as_u64() {
            return Ok(n);
        }
        Ok(number(&value).filter(|n| *n >= 0.0).map(|n| n as u64).unwrap_or(0))
    }

    pub fn u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        u64(d).map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(number(&Value::deserialize(d)?))
    }
}
