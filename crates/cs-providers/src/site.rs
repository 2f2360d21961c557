use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported coding sites. The lowercase name keys the settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    LeetCode,
    HackerRank,
}

impl Site {
    pub fn name(self) -> &'static str {
        match self {
            Self::LeetCode => "leetcode",
            Self::HackerRank => "hackerrank",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::LeetCode => "LeetCode",
            Self::HackerRank => "HackerRank",
        }
    }

    pub fn problem_url(self, slug: &str) -> String {
        match self {
            Self::LeetCode => format!("https://leetcode.com/problems/{}", slug),
            Self::HackerRank => format!("https://www.hackerrank.com/challenges/{}", slug),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
