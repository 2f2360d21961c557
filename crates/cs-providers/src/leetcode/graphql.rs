//! GraphQL operation routing.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SubmissionDetails,
    LearningContext,
    QuestionDetail,
    Other(String),
}

impl Operation {
    pub fn from_name(name: &str) -> Self {
        match name {
            "submissionDetails" => Self::SubmissionDetails,
            "learningContext" => Self::LearningContext,
            "questionDetail" => Self::QuestionDetail,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SubmissionDetails => "submissionDetails",
            Self::LearningContext => "learningContext",
            Self::QuestionDetail => "questionDetail",
            Self::Other(name) => name,
        }
    }
}

/// `operationName` of a GraphQL request body. Accepts the parsed object, a
/// body that is still a JSON string, or a batch (first entry wins).
pub fn operation_name(payload: &Value) -> Option<String> {
    match payload {
        Value::Object(map) => map.get("operationName").and_then(Value::as_str).map(str::to_string),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|v| !v.is_string())
            .and_then(|v| operation_name(&v)),
        Value::Array(batch) => batch.first().and_then(operation_name),
        _ => None,
    }
}

pub fn operation(payload: &Value) -> Option<Operation> {
    operation_name(payload).map(|name| Operation::from_name(&name))
}
