//! Request and response snapshots handed to handlers.
//!
//! Contexts are immutable value objects. They serialize to plain JSON with the
//! camelCase field names the page scripts use, so the same shape crosses the
//! bridge unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::url::parse_query_params;

pub type HeaderMap = BTreeMap<String, String>;

// =============================================================================
// Raw bodies
// =============================================================================

/// Body as produced by the underlying network primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    Empty,
    /// Already decoded by the primitive (`responseType = "json"`).
    Json(Value),
    /// Text body (`responseText`, string request bodies).
    Text(String),
    /// Binary blob of unknown type; decoded as text first.
    Blob(Vec<u8>),
    /// Bytes from a cloned response, routed by content type.
    Bytes {
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

impl RawBody {
    /// Parse opportunistically: JSON first, then text.
    ///
    /// Returns `None` when there is nothing to capture, including bodies whose
    /// content type is neither JSON nor text.
    pub fn parse(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value.clone()),
            Self::Text(text) => Some(json_or_text(text)),
            Self::Blob(data) => Some(json_or_text(&String::from_utf8_lossy(data))),
            Self::Bytes { content_type, data } => {
                let ct = content_type.as_deref().unwrap_or("").to_ascii_lowercase();
                if ct.contains("json") {
                    match serde_json::from_slice(data) {
                        Ok(value) => Some(value),
                        Err(_) => Some(Value::String(String::from_utf8_lossy(data).into_owned())),
                    }
                } else if ct.is_empty() || ct.starts_with("text/") {
                    Some(json_or_text(&String::from_utf8_lossy(data)))
                } else {
                    None
                }
            }
        }
    }
}

fn json_or_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn find_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// =============================================================================
// Request Context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    method: String,
    path: String,
    #[serde(default)]
    headers: HeaderMap,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    query_params: BTreeMap<String, String>,
    #[serde(default)]
    url_params: BTreeMap<String, String>,
}

impl RequestContext {
    /// Build from the raw pieces of an outgoing request.
    pub fn new(method: &str, url: &str, headers: HeaderMap, body: &RawBody) -> Self {
        let method = if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_ascii_uppercase()
        };
        Self {
            method,
            path: url.to_string(),
            headers,
            payload: body.parse().unwrap_or(Value::Null),
            query_params: parse_query_params(url),
            url_params: BTreeMap::new(),
        }
    }

    pub fn with_url_params(mut self, url_params: BTreeMap<String, String>) -> Self {
        self.url_params = url_params;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    pub fn url_params(&self) -> &BTreeMap<String, String> {
        &self.url_params
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request [{} {}]", self.method, self.path)
    }
}

// =============================================================================
// Response Context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContext {
    status_code: u16,
    #[serde(default)]
    headers: HeaderMap,
    #[serde(default)]
    payload: Value,
}

impl ResponseContext {
    pub fn new(status_code: u16, headers: HeaderMap, body: &RawBody) -> Self {
        Self {
            status_code,
            headers,
            payload: body.parse().unwrap_or(Value::Null),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl fmt::Display for ResponseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response [{}]", self.status_code)
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// A matched request/response pair; the unit handlers receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub request_context: RequestContext,
    pub response_context: ResponseContext,
}

impl Exchange {
    pub fn new(request_context: RequestContext, response_context: ResponseContext) -> Self {
        Self {
            request_context,
            response_context,
        }
    }

    pub fn request(&self) -> &RequestContext {
        &self.request_context
    }

    pub fn response(&self) -> &ResponseContext {
        &self.response_context
    }
}
