use std::sync::Arc;

use cs_core::bridge::{HandlerReturn, RemoteClass, RemoteMethods};
use cs_core::url::segment_after;
use cs_core::{Exchange, HandlerError};
use serde_json::json;

use super::format::{format_submission, is_pending};
use super::CLASS_ALIAS;
use crate::site::Site;
use crate::sync::SubmissionSync;

pub struct HackerRankWorker {
    sync: Arc<SubmissionSync>,
}

impl HackerRankWorker {
    pub fn new(sync: Arc<SubmissionSync>) -> Self {
        Self { sync }
    }

    fn on_submission_result(this: &Arc<Self>, exchange: Exchange) -> Result<HandlerReturn, HandlerError> {
        let slug = segment_after(exchange.request().path(), "challenges")
            .ok_or(HandlerError::MissingField("challenge slug"))?;
        let model = exchange
            .response()
            .payload()
            .get("model")
            .filter(|m| m.is_object())
            .ok_or(HandlerError::MissingField("model"))?;

        // The page polls this endpoint until the checker finishes.
        if is_pending(model) {
            return Ok(HandlerReturn::Value(json!({"pending": true})));
        }

        let submission = format_submission(model, slug);
        Ok(this.sync.deferred(Site::HackerRank, submission))
    }
}

impl RemoteClass for HackerRankWorker {
    fn class_alias() -> &'static str {
        CLASS_ALIAS
    }

    fn remote_methods(methods: &mut RemoteMethods<Self>) {
        methods.method("onSubmissionResult", HackerRankWorker::on_submission_result);
    }
}
