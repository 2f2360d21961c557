//! Record of solved problems, updated after every successful sync.
//!
//! Serializes to the `lastSolved` / `problemsSolved` shape kept in extension
//! storage, so a record loaded from there can seed a new ledger.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::site::Site;
use crate::submission::Submission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSolved {
    pub slug: String,
    /// Unix millis.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedQuestion {
    pub difficulty: String,
    pub question_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedEntry {
    pub question: SolvedQuestion,
    pub site: Site,
    /// Unix millis.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolvedRecord {
    pub last_solved: Option<LastSolved>,
    /// Keyed by problem slug; a later sync of the same slug replaces the entry.
    pub problems_solved: BTreeMap<String, SolvedEntry>,
}

#[derive(Debug, Default)]
pub struct SolvedLedger {
    record: RwLock<SolvedRecord>,
}

impl SolvedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: SolvedRecord) -> Self {
        Self { record: RwLock::new(record) }
    }

    pub fn record(&self, site: Site, submission: &Submission, at_millis: u64) {
        let slug = submission.slug().to_string();
        let entry = SolvedEntry {
            question: SolvedQuestion {
                difficulty: submission.question.difficulty.clone(),
                question_id: submission.question.question_id.clone(),
            },
            site,
            timestamp: at_millis,
        };
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        record.last_solved = Some(LastSolved { slug: slug.clone(), timestamp: at_millis });
        record.problems_solved.insert(slug, entry);
    }

    pub fn snapshot(&self) -> SolvedRecord {
        self.record.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_solved(&self) -> Option<LastSolved> {
        self.record.read().unwrap_or_else(PoisonError::into_inner).last_solved.clone()
    }

    pub fn len(&self) -> usize {
        self.record.read().unwrap_or_else(PoisonError::into_inner).problems_solved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::Question;
    use serde_json::json;

    fn solved(slug: &str, id: &str) -> Submission {
        Submission {
            question: Question {
                question_id: id.into(),
                title_slug: slug.into(),
                difficulty: "Easy".into(),
                ..Question::default()
            },
            ..Submission::default()
        }
    }

    #[test]
    fn test_record_merges_by_slug() {
        let ledger = SolvedLedger::new();
        ledger.record(Site::LeetCode, &solved("two-sum", "1"), 1_000);
        ledger.record(Site::LeetCode, &solved("add-two-numbers", "2"), 2_000);
        ledger.record(Site::LeetCode, &solved("two-sum", "1"), 3_000);

        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.last_solved(),
            Some(LastSolved { slug: "two-sum".into(), timestamp: 3_000 })
        );
        assert_eq!(ledger.snapshot().problems_solved["two-sum"].timestamp, 3_000);
    }

    #[test]
    fn test_storage_shape() {
        let ledger = SolvedLedger::new();
        ledger.record(Site::HackerRank, &solved("solve-me-first", "2532"), 5);
        assert_eq!(
            serde_json::to_value(ledger.snapshot()).unwrap(),
            json!({
                "lastSolved": {"slug": "solve-me-first", "timestamp": 5},
                "problemsSolved": {"solve-me-first": {
                    "question": {"difficulty": "Easy", "questionId": "2532"},
                    "site": "hackerrank",
                    "timestamp": 5
                }}
            })
        );
    }

    #[test]
    fn test_seeded_from_storage() {
        let record: SolvedRecord = serde_json::from_value(json!({"problemsSolved": {}})).unwrap();
        let ledger = SolvedLedger::with_record(record);
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_solved(), None);
    }
}
