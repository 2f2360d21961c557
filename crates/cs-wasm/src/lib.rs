//! WebAssembly bindings for CodeSync
//!
//! The page script wraps `fetch` and `XMLHttpRequest` and calls into this
//! module: `should_intercept` before reading any body, `on_exchange` once a
//! matched exchange completes. Everything that leaves the page goes through
//! a single JavaScript poster function, called as `poster(channel, json)`
//! with channel `"bridge"` for handler dispatch and `"event"` for page events.

mod console;
mod exchange;

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use cs_core::{BridgeError, BridgeMessage, PatternRegistry, RemoteTransport, RequestContext, ResponseContext};
use cs_providers::{bind_page_handlers, PageEvent, PageEvents};
use wasm_bindgen::prelude::*;

static REGISTRY: OnceLock<PatternRegistry> = OnceLock::new();

thread_local! {
    static POSTER: RefCell<Option<js_sys::Function>> = const { RefCell::new(None) };
}

fn post(channel: &str, json: &str) -> Result<(), JsValue> {
    POSTER.with(|poster| match poster.borrow().as_ref() {
        Some(poster) => poster
            .call2(&JsValue::NULL, &JsValue::from_str(channel), &JsValue::from_str(json))
            .map(|_| ()),
        None => Err(JsValue::from_str("No poster installed")),
    })
}

/// Sends bridge envelopes through the poster.
struct PosterTransport;

impl RemoteTransport for PosterTransport {
    fn transmit(&self, message: BridgeMessage) -> Result<(), BridgeError> {
        message.validate()?;
        post("bridge", &message.to_json()).map_err(|e| {
            log::warn!("Bridge post failed: {:?}", e);
            BridgeError::Unreachable
        })
    }
}

/// Posts page events through the poster.
struct PosterEvents;

impl PageEvents for PosterEvents {
    fn emit(&self, event: PageEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to encode {} event: {}", event.kind, e);
                return;
            }
        };
        if let Err(e) = post("event", &json) {
            log::warn!("Event post failed: {:?}", e);
        }
    }
}

/// Bind the page handlers and route their output to `poster`.
///
/// The registry is created once per page; calling again only swaps the poster.
#[wasm_bindgen]
pub fn install(poster: js_sys::Function, log_level: Option<String>) -> Result<JsValue, JsValue> {
    console::init(console::parse_level(log_level.as_deref()));
    POSTER.with(|slot| *slot.borrow_mut() = Some(poster));

    if let Some(registry) = REGISTRY.get() {
        return Ok(JsValue::from(registry.bound_len() as u32));
    }

    let registry = PatternRegistry::new();
    registry.set_remote_transport(Arc::new(PosterTransport));
    let bound = bind_page_handlers(&registry, Arc::new(PosterEvents));
    REGISTRY
        .set(registry)
        .map_err(|_| JsValue::from_str("Failed to set registry"))?;

    log::info!("CodeSync interceptor installed with {} handler(s)", bound);
    Ok(JsValue::from(bound as u32))
}

#[wasm_bindgen]
pub fn is_installed() -> bool {
    REGISTRY.get().is_some()
}

/// Fast path: `true` only when some bound handler wants this URL.
#[wasm_bindgen]
pub fn should_intercept(url: &str) -> bool {
    REGISTRY.get().is_some_and(|registry| registry.matches(url))
}

/// Dispatch a completed exchange. Returns `{matched, succeeded, failed}`.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn on_exchange(
    method: &str,
    url: &str,
    request_headers: Option<String>,
    request_body: Option<String>,
    status: u16,
    response_headers: Option<String>,
    response_body: Option<String>,
    response_content_type: Option<String>,
) -> Result<JsValue, JsValue> {
    let registry = REGISTRY
        .get()
        .ok_or_else(|| JsValue::from_str("Not installed. Call install() first."))?;

    let result = js_sys::Object::new();
    if !(200..300).contains(&status) {
        let _ = js_sys::Reflect::set(&result, &"matched".into(), &JsValue::from(0));
        return Ok(result.into());
    }

    let request = RequestContext::new(
        method,
        url,
        exchange::parse_headers(request_headers.as_deref()),
        &exchange::raw_body(request_body, None),
    );
    let response = ResponseContext::new(
        status,
        exchange::parse_headers(response_headers.as_deref()),
        &exchange::raw_body(response_body, response_content_type),
    );
    let report = registry.dispatch(request, response);

    let _ = js_sys::Reflect::set(&result, &"matched".into(), &JsValue::from(report.matched as u32));
    let _ = js_sys::Reflect::set(&result, &"succeeded".into(), &JsValue::from(report.succeeded as u32));
    let _ = js_sys::Reflect::set(&result, &"failed".into(), &JsValue::from(report.failed as u32));
    Ok(result.into())
}

/// Bound handlers as `{id, pattern, mode}` objects.
#[wasm_bindgen]
pub fn bound_handlers() -> js_sys::Array {
    let handlers = js_sys::Array::new();
    let Some(registry) = REGISTRY.get() else {
        return handlers;
    };
    for (id, pattern, mode) in registry.bound_handlers() {
        let entry = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&entry, &"id".into(), &JsValue::from_str(&id.to_string()));
        let _ = js_sys::Reflect::set(&entry, &"pattern".into(), &JsValue::from_str(&pattern.to_string()));
        let _ = js_sys::Reflect::set(&entry, &"mode".into(), &JsValue::from_str(&format!("{:?}", mode)));
        handlers.push(&entry);
    }
    handlers
}
