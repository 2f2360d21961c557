//! Conversion of raw values handed over by the page script.

use cs_core::context::HeaderMap;
use cs_core::RawBody;

/// Headers arrive as a JSON object string. Anything else is an empty map.
pub fn parse_headers(json: Option<&str>) -> HeaderMap {
    let Some(json) = json.filter(|j| !j.trim().is_empty()) else {
        return HeaderMap::new();
    };
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(json) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(s) => Some((name, s)),
                serde_json::Value::Number(n) => Some((name, n.to_string())),
                _ => None,
            })
            .collect(),
        Err(e) => {
            log::debug!("Ignoring malformed header map: {}", e);
            HeaderMap::new()
        }
    }
}

/// Body text as read by the page. With a content type the body is routed
/// like a cloned fetch response; without one it is plain text.
pub fn raw_body(body: Option<String>, content_type: Option<String>) -> RawBody {
    match (body, content_type) {
        (None, _) => RawBody::Empty,
        (Some(text), None) => RawBody::Text(text),
        (Some(text), Some(content_type)) => RawBody::Bytes {
            content_type: Some(content_type),
            data: text.into_bytes(),
        },
    }
}
