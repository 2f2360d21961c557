//! Conversion of a HackerRank submission `model` into a [`Submission`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::submission::{Language, Question, Submission, ACCEPTED};

/// Statuses reported while the checker is still running.
const PENDING_STATUSES: &[&str] = &["Processing", "Queued", "Compiling", "Running"];

pub fn is_pending(model: &Value) -> bool {
    model
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| PENDING_STATUSES.contains(&status))
}

/// Map a HackerRank status string onto the shared status codes. A model
/// without a status is treated as accepted.
pub fn status_code(status: Option<&str>) -> u32 {
    match status {
        None | Some("Accepted") => ACCEPTED,
        Some("Wrong Answer") => 11,
        Some("Terminated due to timeout") => 14,
        Some("Runtime Error") => 15,
        Some("Compilation error") => 20,
        Some(_) => 0,
    }
}

/// Build a submission from the `model` object of a submission-result
/// response. `challenge_slug` comes from the request URL.
pub fn format_submission(model: &Value, challenge_slug: &str) -> Submission {
    let str_field = |key: &str| model.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    let language = str_field("language").unwrap_or_default();
    let runtime_ms = average_checker_time(model) * 1000.0;
    let runtime_ms = runtime_ms.round() as u64;

    let question_id = match model.get("challenge_id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => challenge_slug.to_string(),
    };
    let name = str_field("name").map(str::to_string);
    let display_name = name.clone().unwrap_or_else(|| challenge_slug.to_string());
    let track = model
        .get("track")
        .and_then(|t| t.get("track_name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown");

    Submission {
        code: str_field("code").unwrap_or_default().to_string(),
        lang: Language::new(language.to_lowercase(), language),
        status_code: status_code(str_field("status")),
        timestamp: model.get("created_at").map_or(0, timestamp_secs),
        runtime_display: format!("{}ms", runtime_ms),
        runtime_percentile: Some(50.0),
        memory_display: "N/A".to_string(),
        memory_percentile: Some(50.0),
        question: Question {
            question_id,
            question_frontend_id: challenge_slug.to_string(),
            title: name.unwrap_or_else(|| title_case(challenge_slug)),
            title_slug: challenge_slug.to_string(),
            content: format!(
                "<p>HackerRank Problem: {}</p><p>Track: {}</p>",
                display_name, track
            ),
            difficulty: "Medium".to_string(),
        },
        notes: String::new(),
    }
}

fn average_checker_time(model: &Value) -> f64 {
    let times: Vec<f64> = model
        .get("codechecker_time")
        .and_then(Value::as_array)
        .map(|times| times.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default();
    if times.is_empty() {
        0.0
    } else {
        times.iter().sum::<f64>() / times.len() as f64
    }
}

/// `solve-me-first` -> `Solve Me First`.
fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// =============================================================================
// Timestamps
// =============================================================================

/// Unix seconds from `created_at`: an ISO 8601 string, or a number in
/// seconds or milliseconds. Unparseable values give 0.
fn timestamp_secs(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            let n = n.as_f64().unwrap_or(0.0).max(0.0);
            if n > 1e12 {
                (n / 1000.0) as u64
            } else {
                n as u64
            }
        }
        Value::String(s) => parse_iso8601(s).unwrap_or(0),
        _ => 0,
    }
}

/// Parse an RFC 3339 timestamp into unix seconds. Offset-less date-times
/// and bare dates are read as UTC.
pub fn parse_iso8601(s: &str) -> Option<u64> {
    let s = s.trim().to_ascii_uppercase();
    let secs = match DateTime::parse_from_rfc3339(&s) {
        Ok(dt) => dt.timestamp(),
        Err(_) => parse_naive(&s)?.and_utc().timestamp(),
    };
    u64::try_from(secs).ok()
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_model() {
        let model = json!({
            "id": 412345678,
            "challenge_id": 2532,
            "name": "Solve Me First",
            "language": "Python3",
            "status": "Accepted",
            "code": "print(sum(map(int, open(0))))",
            "codechecker_time": [0.05, 0.07, 0.06],
            "created_at": "2024-06-10T12:00:00.000Z",
            "track": {"track_name": "Algorithms"}
        });
        let s = format_submission(&model, "solve-me-first");

        assert!(s.is_accepted());
        assert_eq!(s.lang, Language::new("python3", "Python3"));
        assert_eq!(s.extension(), Some(".py"));
        assert_eq!(s.runtime_display, "60ms");
        assert_eq!(s.memory_display, "N/A");
        assert_eq!(s.question.question_id, "2532");
        assert_eq!(s.frontend_id(), "solve-me-first");
        assert_eq!(s.question.title, "Solve Me First");
        assert_eq!(
            s.question.content,
            "<p>HackerRank Problem: Solve Me First</p><p>Track: Algorithms</p>"
        );
        assert_eq!(s.timestamp, 1_718_020_800);
    }

    #[test]
    fn test_format_sparse_model() {
        let s = format_submission(&json!({"language": "java8", "status": "Wrong Answer"}), "simple-array-sum");
        assert_eq!(s.status_code, 11);
        assert_eq!(s.question.title, "Simple Array Sum");
        assert_eq!(s.question.question_id, "simple-array-sum");
        assert_eq!(s.runtime_display, "0ms");
        assert!(s.question.content.ends_with("<p>Track: Unknown</p>"));
        assert_eq!(s.timestamp, 0);
    }

    #[test]
    fn test_pending_statuses() {
        assert!(is_pending(&json!({"status": "Processing"})));
        assert!(!is_pending(&json!({"status": "Accepted"})));
        assert!(!is_pending(&json!({})));
    }

    #[test]
    fn test_parse_iso8601() {
        assert_eq!(parse_iso8601("1970-01-01T00:00:00Z"), Some(0));
        assert_eq!(parse_iso8601("2000-03-01T00:00:00Z"), Some(951_868_800));
        assert_eq!(parse_iso8601("2024-06-10T14:00:00+02:00"), Some(1_718_020_800));
        assert_eq!(parse_iso8601("2024-06-10T12:00:00"), Some(1_718_020_800));
        assert_eq!(parse_iso8601("2024-06-10"), Some(1_717_977_600));
        assert_eq!(parse_iso8601("yesterday"), None);
        assert_eq!(parse_iso8601("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_parse_iso8601_rejects_impossible_dates() {
        assert_eq!(parse_iso8601("2024-02-31T00:00:00Z"), None);
        assert_eq!(parse_iso8601("2023-02-29"), None);
        assert_eq!(parse_iso8601("2024-02-29T00:00:00Z"), Some(1_709_164_800));
    }

    #[test]
    fn test_parse_iso8601_lowercase_separators() {
        assert_eq!(parse_iso8601("2024-06-10t12:00:00z"), Some(1_718_020_800));
        assert_eq!(parse_iso8601("2024-06-10T12:00:00.250z"), Some(1_718_020_800));
        assert_eq!(parse_iso8601("1969-12-31T23:59:59Z"), None);
    }

    #[test]
    fn test_lowercase_created_at_stays_fresh() {
        let model = json!({"status": "Accepted", "created_at": "2024-06-10t12:00:00z"});
        let s = format_submission(&model, "solve-me-first");
        assert_eq!(s.timestamp, 1_718_020_800);
        assert!(s.is_recent(1_718_020_810, crate::submission::DEFAULT_FRESHNESS_WINDOW));
    }

    #[test]
    fn test_numeric_created_at() {
        assert_eq!(timestamp_secs(&json!(1_718_020_800)), 1_718_020_800);
        assert_eq!(timestamp_secs(&json!(1_718_020_800_123u64)), 1_718_020_800);
    }
}
