use cs_core::binding::{Declarations, HandlerClass};
use cs_core::UrlPattern;

use super::CLASS_ALIAS;

/// Page-side declarations for HackerRank. Everything runs in the worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct HackerRankApiHandlers;

impl HandlerClass for HackerRankApiHandlers {
    fn class_alias() -> &'static str {
        CLASS_ALIAS
    }

    fn declare(d: &mut Declarations<Self>) {
        d.remote(
            UrlPattern::regex(r"/rest/contests/[^/]+/challenges/[^/]+/submissions/\d+"),
            "onSubmissionResult",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::{DispatchMode, PatternRegistry};
    use std::sync::Arc;

    #[test]
    fn test_result_endpoint_matches() {
        let registry = PatternRegistry::new();
        assert_eq!(registry.bind(Arc::new(HackerRankApiHandlers)), 1);

        assert!(registry.matches(
            "https://www.hackerrank.com/rest/contests/master/challenges/solve-me-first/submissions/412345678"
        ));
        // Submitting (no id yet) and listing are not results.
        assert!(!registry.matches("https://www.hackerrank.com/rest/contests/master/challenges/solve-me-first/submissions"));
        assert!(!registry.matches("https://www.hackerrank.com/challenges/solve-me-first/problem"));

        let (id, _, mode) = registry.bound_handlers().remove(0);
        assert_eq!(id.to_string(), "HackerRankApiHandlers:onSubmissionResult");
        assert_eq!(mode, DispatchMode::Remote);
    }
}
