use std::sync::Arc;

use cs_core::bridge::{HandlerReturn, RemoteClass, RemoteMethods};
use cs_core::url::segment_after;
use cs_core::{Exchange, HandlerError, SubmissionCache};
use serde_json::json;

use super::graphql::{self, Operation};
use super::CLASS_ALIAS;
use crate::site::Site;
use crate::submission::{parse_submission_details, Submission};
use crate::sync::SubmissionSync;

/// LeetCode handlers on the worker side of the bridge.
///
/// The detail query fills the cache; the submit call that usually lands
/// around the same time reads it back.
pub struct LeetCodeWorker {
    cache: Arc<SubmissionCache<Submission>>,
    sync: Arc<SubmissionSync>,
}

impl LeetCodeWorker {
    pub fn new(cache: Arc<SubmissionCache<Submission>>, sync: Arc<SubmissionSync>) -> Self {
        Self { cache, sync }
    }

    pub fn cache(&self) -> &SubmissionCache<Submission> {
        &self.cache
    }

    fn on_submission_submit(this: &Arc<Self>, exchange: Exchange) -> Result<HandlerReturn, HandlerError> {
        let slug = segment_after(exchange.request().path(), "problems")
            .ok_or(HandlerError::MissingField("problem slug"))?;

        match this.cache.get(slug) {
            Some(submission) if submission.is_accepted() => Ok(this.sync.deferred(Site::LeetCode, submission)),
            Some(submission) => {
                log::debug!("Cached {} is {}; nothing to sync", slug, submission.status_name());
                Ok(HandlerReturn::Value(json!({"cached": true, "accepted": false})))
            }
            None => Ok(HandlerReturn::Value(json!({"cached": false}))),
        }
    }

    fn on_graphql(this: &Arc<Self>, exchange: Exchange) -> Result<HandlerReturn, HandlerError> {
        let Some(operation) = graphql::operation(exchange.request().payload()) else {
            return Ok(HandlerReturn::Done);
        };

        match operation {
            Operation::SubmissionDetails => {
                let submission = parse_submission_details(exchange.response().payload())
                    .map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
                this.cache.set(submission.slug(), submission.clone());
                Ok(this.sync.deferred(Site::LeetCode, submission))
            }
            Operation::LearningContext | Operation::QuestionDetail => {
                log::debug!("GraphQL {} observed", operation.name());
                Ok(HandlerReturn::Done)
            }
            Operation::Other(_) => Ok(HandlerReturn::Done),
        }
    }
}

impl RemoteClass for LeetCodeWorker {
    fn class_alias() -> &'static str {
        CLASS_ALIAS
    }

    fn remote_methods(methods: &mut RemoteMethods<Self>) {
        methods
            .method("onSubmissionSubmit", LeetCodeWorker::on_submission_submit)
            .method("onGraphQL", LeetCodeWorker::on_graphql);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncConfig;
    use cs_core::bridge::{HandlerTable, ReplyStatus};
    use cs_core::context::HeaderMap;
    use cs_core::upload::{ContentUploader, UploadError};
    use cs_core::{BoxFuture, RawBody, RequestContext, ResponseContext, SettingsSnapshot};
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ContentUploader for Recorder {
        fn upload<'a>(
            &'a self,
            path: &'a str,
            filename: &'a str,
            _content: &'a [u8],
            _commit_message: &'a str,
            _overwrite: bool,
        ) -> BoxFuture<'a, Result<bool, UploadError>> {
            Box::pin(async move {
                self.0.lock().unwrap().push(format!("{}/{}", path, filename));
                Ok(true)
            })
        }
    }

    fn setup() -> (HandlerTable, Arc<LeetCodeWorker>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let sync = SubmissionSync::new(recorder.clone(), SettingsSnapshot::default(), SyncConfig::default());
        let worker = Arc::new(LeetCodeWorker::new(Arc::new(SubmissionCache::new()), Arc::new(sync)));
        let mut table = HandlerTable::new();
        table.register(Arc::clone(&worker));
        (table, worker, recorder)
    }

    fn exchange(url: &str, request: Value, response: Value) -> Exchange {
        Exchange::new(
            RequestContext::new("POST", url, HeaderMap::new(), &RawBody::Json(request)),
            ResponseContext::new(200, HeaderMap::new(), &RawBody::Json(response)),
        )
    }

    fn details(status: u32) -> Value {
        json!({"data": {"submissionDetails": {
            "code": "fn main() {}",
            "statusCode": status,
            "timestamp": cs_core::unix_millis() / 1000,
            "lang": {"name": "rust", "verboseName": "Rust"},
            "question": {"questionFrontendId": "1", "title": "Two Sum", "titleSlug": "two-sum"}
        }}})
    }

    #[tokio::test]
    async fn test_submit_without_cache_entry() {
        let (table, _, recorder) = setup();
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onSubmissionSubmit",
                exchange("https://leetcode.com/problems/two-sum/submit/", Value::Null, Value::Null),
            )
            .await;
        assert_eq!(reply.value, Some(json!({"cached": false})));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_graphql_details_cache_and_sync() {
        let (table, worker, recorder) = setup();
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onGraphQL",
                exchange(
                    "https://leetcode.com/graphql/",
                    json!({"operationName": "submissionDetails"}),
                    details(10),
                ),
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Ok);
        assert_eq!(reply.value.as_ref().unwrap()["outcome"], "synced");
        assert!(worker.cache().get("two-sum").is_some());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["leetcode/1-two-sum/README.md", "leetcode/1-two-sum/two-sum.rs"]
        );

        // The submit signal for the same submission is a duplicate.
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onSubmissionSubmit",
                exchange("https://leetcode.com/problems/two-sum/submit/", Value::Null, Value::Null),
            )
            .await;
        assert_eq!(reply.value.as_ref().unwrap()["outcome"], "duplicate");
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_cached_not_synced() {
        let (table, _, recorder) = setup();
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onGraphQL",
                exchange(
                    "https://leetcode.com/graphql/",
                    json!({"operationName": "submissionDetails"}),
                    details(11),
                ),
            )
            .await;
        assert_eq!(
            reply.value,
            Some(json!({"outcome": "rejected", "status": "Wrong Answer"}))
        );

        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onSubmissionSubmit",
                exchange("https://leetcode.com/problems/two-sum/submit/", Value::Null, Value::Null),
            )
            .await;
        assert_eq!(reply.value, Some(json!({"cached": true, "accepted": false})));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_operations_ignored() {
        let (table, worker, _) = setup();
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onGraphQL",
                exchange("https://leetcode.com/graphql/", json!({"operationName": "questionDetail"}), json!({})),
            )
            .await;
        assert_eq!(reply, cs_core::BridgeReply::ok(None));
        assert!(worker.cache().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_details_is_error_reply() {
        let (table, _, _) = setup();
        let reply = table
            .invoke(
                "LeetCodeApiHandlers:onGraphQL",
                exchange(
                    "https://leetcode.com/graphql/",
                    json!({"operationName": "submissionDetails"}),
                    json!({"data": {}}),
                ),
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Error);
    }
}
