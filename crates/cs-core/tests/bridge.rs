use std::sync::{Arc, Mutex};
use std::time::Duration;

use cs_core::binding::{Declarations, HandlerClass};
use cs_core::bridge::{
    channel, spawn_relay, BridgeClient, BridgeConfig, BridgeReceiver, HandlerReturn, HandlerTable,
    RemoteClass, RemoteMethods,
};
use cs_core::context::HeaderMap;
use cs_core::{
    BridgeMessage, Exchange, HandlerId, PatternRegistry, RawBody, ReplyStatus,
    RequestContext, ResponseContext, UrlPattern,
};
use serde_json::json;

/// Page side: declares, never runs a body.
struct ApiHandlers;

impl HandlerClass for ApiHandlers {
    fn class_alias() -> &'static str {
        "ApiHandlers"
    }

    fn declare(d: &mut Declarations<Self>) {
        d.remote(UrlPattern::regex(r"/problems/[^/]+/submit/"), "onSubmit");
        d.remote(UrlPattern::regex("graphql"), "onGraphQL");
    }
}

/// Worker side of the same alias.
#[derive(Default)]
struct WorkerHandlers {
    received: Mutex<Vec<(String, Exchange)>>,
}

impl RemoteClass for WorkerHandlers {
    fn class_alias() -> &'static str {
        "ApiHandlers"
    }

    fn remote_methods(methods: &mut RemoteMethods<Self>) {
        methods
            .method("onSubmit", |this, exchange| {
                this.received.lock().unwrap().push(("onSubmit".into(), exchange));
                Ok(HandlerReturn::Done)
            })
            .method("onGraphQL", |this, exchange| {
                let this = Arc::clone(this);
                Ok(HandlerReturn::deferred(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    this.received.lock().unwrap().push(("onGraphQL".into(), exchange));
                    Ok(Some(json!({"cached": true})))
                }))
            });
    }
}

fn contexts(url: &str, body: serde_json::Value) -> (RequestContext, ResponseContext) {
    (
        RequestContext::new("POST", url, HeaderMap::new(), &RawBody::Empty),
        ResponseContext::new(200, HeaderMap::new(), &RawBody::Json(body)),
    )
}

fn config() -> BridgeConfig {
    BridgeConfig {
        reply_timeout: Duration::from_millis(500),
        retry_delay: Duration::from_millis(10),
    }
}

#[test]
fn test_message_round_trip_keeps_fields() {
    let (req, resp) = contexts(
        "https://site.example/problems/two-sum/submit/",
        json!({"status_code": 10, "lang": "python3"}),
    );
    let exchange = Exchange::new(req, resp);
    let wire = BridgeMessage::dispatch(&HandlerId::new("ApiHandlers", "onSubmit"), &exchange).to_json();
    let back = BridgeMessage::from_json(&wire).unwrap();

    assert_eq!(back.contexts.request().path(), exchange.request().path());
    assert_eq!(back.contexts.response().status_code(), 200);
    assert_eq!(back.contexts.response().payload(), exchange.response().payload());
}

#[tokio::test]
async fn test_remote_dispatch_reaches_worker() {
    let worker = Arc::new(WorkerHandlers::default());
    let mut table = HandlerTable::new();
    table.register(Arc::clone(&worker));

    let (worker_tx, worker_inbox) = channel(16);
    let (page_tx, page_inbox) = channel(16);
    BridgeReceiver::new(table).spawn(worker_inbox);
    spawn_relay(page_inbox, worker_tx);

    let (client, outbox) = BridgeClient::spawn(page_tx, config());
    let registry = PatternRegistry::new();
    registry.set_remote_transport(Arc::new(client));
    assert_eq!(registry.bind(Arc::new(ApiHandlers)), 2);

    let (req, resp) = contexts("https://site.example/problems/two-sum/submit/", json!({"submission_id": 1}));
    assert_eq!(registry.dispatch(req, resp).succeeded, 1);
    let (req, resp) = contexts("https://site.example/graphql/", json!({"data": {}}));
    assert_eq!(registry.dispatch(req, resp).succeeded, 1);

    // Dropping the last client handle lets the outbox drain and finish.
    registry.clear_remote_transport();
    outbox.await.unwrap();

    let received = worker.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    let names: Vec<&str> = received.iter().map(|(name, _)| name.as_str()).collect();
    assert!(names.contains(&"onSubmit"));
    assert!(names.contains(&"onGraphQL"));
    let submit = received.iter().find(|(name, _)| name == "onSubmit").unwrap();
    assert!(submit.1.request().path().contains("two-sum"));
}

#[tokio::test]
async fn test_unknown_handler_is_not_found() {
    let (worker_tx, worker_inbox) = channel(4);
    BridgeReceiver::new(HandlerTable::new()).spawn(worker_inbox);
    let (client, _) = BridgeClient::spawn(worker_tx, config());

    let (req, resp) = contexts("/x", json!(null));
    let message = BridgeMessage::dispatch(&HandlerId::new("Nobody", "onNothing"), &Exchange::new(req, resp));
    let reply = client.send(message).await.unwrap();
    assert_eq!(reply.status, ReplyStatus::NotFound);
}

#[tokio::test]
async fn test_deferred_reply_carries_value() {
    let mut table = HandlerTable::new();
    table.register(Arc::new(WorkerHandlers::default()));
    let (worker_tx, worker_inbox) = channel(4);
    BridgeReceiver::new(table).spawn(worker_inbox);
    let (client, _) = BridgeClient::spawn(worker_tx, config());

    let (req, resp) = contexts("https://site.example/graphql/", json!({}));
    let message = BridgeMessage::dispatch(&HandlerId::new("ApiHandlers", "onGraphQL"), &Exchange::new(req, resp));
    let reply = client.send(message).await.unwrap();
    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(reply.value, Some(json!({"cached": true})));
}

