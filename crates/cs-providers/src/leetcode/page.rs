use std::sync::Arc;

use cs_core::binding::{Declarations, HandlerClass};
use cs_core::url::segment_after;
use cs_core::{Exchange, HandlerError, UrlPattern};
use serde_json::Value;

use super::CLASS_ALIAS;
use crate::events::{PageEvent, PageEvents, SubmissionSummary, SUBMISSION_DATA};

/// LeetCode handlers declared in the page context.
///
/// Only the submission-detail hook runs here; submit and GraphQL traffic is
/// forwarded to the worker under the same class alias.
pub struct LeetCodeApiHandlers {
    events: Arc<dyn PageEvents>,
}

impl LeetCodeApiHandlers {
    pub fn new(events: Arc<dyn PageEvents>) -> Self {
        Self { events }
    }

    fn on_submission_detail(&self, exchange: &Exchange) -> Result<(), HandlerError> {
        let request = exchange.request();
        log::debug!("{} -> {}", request, exchange.response());

        let submission_id = segment_after(request.path(), "detail")
            .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
            .map(str::to_string);
        let data = exchange.response().payload();

        let summary = SubmissionSummary {
            submission_id,
            language: first_string(data, &[&["lang"], &["submission", "lang"], &["programmingLanguage"]]),
            status: first_string(data, &[&["statusDisplay"], &["status"], &["state"]]),
            raw: data.clone(),
        };
        self.events.emit(PageEvent {
            kind: SUBMISSION_DATA,
            provider: "LeetCode",
            data: summary,
            timestamp: cs_core::unix_millis(),
        });
        Ok(())
    }
}

impl HandlerClass for LeetCodeApiHandlers {
    fn class_alias() -> &'static str {
        CLASS_ALIAS
    }

    fn declare(d: &mut Declarations<Self>) {
        d.local(
            UrlPattern::substring("/submissions/detail"),
            "onSubmissionDetail",
            LeetCodeApiHandlers::on_submission_detail,
        );
        d.remote(UrlPattern::regex(r"/problems/[^/]+/submit/"), "onSubmissionSubmit");
        d.remote(UrlPattern::regex("graphql"), "onGraphQL");
    }
}

/// First non-empty scalar found along any of `paths`, rendered as a string.
fn first_string(data: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let value = path.iter().try_fold(data, |v, key| v.get(*key))?;
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::context::HeaderMap;
    use cs_core::{PatternRegistry, RawBody, RequestContext, ResponseContext};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured(Mutex<Vec<PageEvent>>);

    impl PageEvents for Captured {
        fn emit(&self, event: PageEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_detail_emits_submission_data() {
        let events = Arc::new(Captured::default());
        let registry = PatternRegistry::new();
        registry.bind(Arc::new(LeetCodeApiHandlers::new(events.clone())));

        let report = registry.dispatch(
            RequestContext::new(
                "GET",
                "https://leetcode.com/submissions/detail/1234567/check/",
                HeaderMap::new(),
                &RawBody::Empty,
            ),
            ResponseContext::new(
                200,
                HeaderMap::new(),
                &RawBody::Json(json!({"submission": {"lang": "rust"}, "status": 10, "state": "SUCCESS"})),
            ),
        );
        assert_eq!(report.succeeded, 1);

        let events = events.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "SUBMISSION_DATA");
        assert_eq!(events[0].data.submission_id.as_deref(), Some("1234567"));
        assert_eq!(events[0].data.language.as_deref(), Some("rust"));
        assert_eq!(events[0].data.status.as_deref(), Some("10"));
    }

    #[test]
    fn test_declared_patterns() {
        let registry = PatternRegistry::new();
        registry.bind(Arc::new(LeetCodeApiHandlers::new(Arc::new(crate::events::LogEvents))));
        let ids: Vec<String> = registry
            .bound_handlers()
            .into_iter()
            .map(|(id, _, _)| id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "LeetCodeApiHandlers:onSubmissionDetail",
                "LeetCodeApiHandlers:onSubmissionSubmit",
                "LeetCodeApiHandlers:onGraphQL",
            ]
        );
        assert!(registry.matches("https://leetcode.com/graphql/"));
        assert!(registry.matches("https://leetcode.com/problems/two-sum/submit/"));
        assert!(!registry.matches("https://leetcode.com/problems/two-sum/description/"));
    }
}
