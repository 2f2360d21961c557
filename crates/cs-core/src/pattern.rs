//! URL interest patterns.
//!
//! A pattern is either a literal substring (case-sensitive containment) or a
//! regular expression tested against the whole URL. Regexes are compiled once,
//! at declaration time. A malformed regex is kept but never matches.

use std::fmt;

use regex::Regex;

#[derive(Clone)]
pub enum UrlPattern {
    Substring(String),
    Regex {
        source: String,
        /// `None` when the source failed to compile.
        compiled: Option<Regex>,
    },
}

impl UrlPattern {
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self::Substring(pattern.into())
    }

    pub fn regex(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("Pattern /{}/ does not compile and will never match: {}", source, e);
                None
            }
        };
        Self::Regex { source, compiled }
    }

    /// Build from the `(pattern, isRegex)` pair used on the wire and in replays.
    pub fn new(pattern: impl Into<String>, is_regex: bool) -> Self {
        if is_regex {
            Self::regex(pattern)
        } else {
            Self::substring(pattern)
        }
    }

    #[inline]
    pub fn matches(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        match self {
            Self::Substring(needle) => url.contains(needle.as_str()),
            Self::Regex { compiled: Some(re), .. } => re.is_match(url),
            Self::Regex { compiled: None, .. } => false,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Substring(s) => s,
            Self::Regex { source, .. } => source,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }

    /// `false` for a regex that failed to compile.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Regex { compiled: None, .. })
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.is_regex() == other.is_regex() && self.source() == other.source()
    }
}

impl Eq for UrlPattern {}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(s) => write!(f, "{:?}", s),
            Self::Regex { source, .. } => write!(f, "/{}/", source),
        }
    }
}
