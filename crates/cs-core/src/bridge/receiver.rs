//! Worker-side handler table and message loop.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use super::message::{BridgeMessage, BridgeReply};
use super::port::Inbox;
use crate::binding::{short_type_name, HandlerId};
use crate::context::Exchange;
use crate::error::HandlerError;
use crate::BoxFuture;

/// How a remote handler finished.
pub enum HandlerReturn {
    /// Completed synchronously with nothing to report.
    Done,
    /// Completed synchronously with a value.
    Value(Value),
    /// Continues asynchronously; the reply waits for it.
    Deferred(BoxFuture<'static, Result<Option<Value>, HandlerError>>),
}

impl HandlerReturn {
    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Option<Value>, HandlerError>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }
}

pub type RemoteFn<C> = fn(&Arc<C>, Exchange) -> Result<HandlerReturn, HandlerError>;

/// Methods a remote class exposes to the bridge, keyed by method alias.
pub struct RemoteMethods<C> {
    entries: Vec<(String, RemoteFn<C>)>,
}

impl<C> RemoteMethods<C> {
    pub fn method(&mut self, alias: &str, handler: RemoteFn<C>) -> &mut Self {
        self.entries.push((alias.to_string(), handler));
        self
    }
}

/// A type whose methods run on the receiving side of the bridge.
pub trait RemoteClass: Send + Sync + Sized + 'static {
    fn class_alias() -> &'static str {
        short_type_name::<Self>()
    }

    fn remote_methods(methods: &mut RemoteMethods<Self>);
}

type ErasedHandler = Arc<dyn Fn(Exchange) -> Result<HandlerReturn, HandlerError> + Send + Sync>;

// =============================================================================
// Handler Table
// =============================================================================

/// Map from `"<ClassAlias>:<MethodAlias>"` to a bound handler.
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<String, ErasedHandler>,
    ids: Vec<String>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every method of `instance`. An id already in the table keeps its
    /// first handler; the duplicate is logged and skipped.
    pub fn register<C: RemoteClass>(&mut self, instance: Arc<C>) -> usize {
        let mut methods = RemoteMethods { entries: Vec::new() };
        C::remote_methods(&mut methods);

        let mut added = 0;
        for (alias, handler) in methods.entries {
            let id = HandlerId::new(C::class_alias(), alias).to_string();
            if self.handlers.contains_key(&id) {
                log::warn!("Remote handler {} already registered; keeping the first", id);
                continue;
            }
            let instance = Arc::clone(&instance);
            self.handlers
                .insert(id.clone(), Arc::new(move |exchange| handler(&instance, exchange)));
            self.ids.push(id);
            added += 1;
        }
        added
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Run the handler for `handler_id` and build the reply. Never fails:
    /// every outcome maps to a reply status.
    pub async fn invoke(&self, handler_id: &str, exchange: Exchange) -> BridgeReply {
        let handler = match self.handlers.get(handler_id) {
            Some(handler) => Arc::clone(handler),
            None => {
                log::warn!("No remote handler for {}", handler_id);
                return BridgeReply::not_found();
            }
        };

        let started = catch_unwind(AssertUnwindSafe(|| handler(exchange)))
            .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic))));

        let settled = match started {
            Ok(HandlerReturn::Done) => Ok(None),
            Ok(HandlerReturn::Value(value)) => Ok(Some(value)),
            Ok(HandlerReturn::Deferred(future)) => match tokio::spawn(future).await {
                Ok(result) => result,
                Err(join) => Err(HandlerError::Panicked(join.to_string())),
            },
            Err(e) => Err(e),
        };

        match settled {
            Ok(value) => BridgeReply::ok(value),
            Err(e) => {
                log::error!("Remote handler {} failed: {}", handler_id, e);
                BridgeReply::error(e.to_string())
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// =============================================================================
// Receiver
// =============================================================================

/// Answers bridge messages from a fixed handler table.
#[derive(Clone)]
pub struct BridgeReceiver {
    table: Arc<HandlerTable>,
}

impl BridgeReceiver {
    pub fn new(table: HandlerTable) -> Self {
        log::info!("Bridge receiver ready with {} handler(s)", table.len());
        Self { table: Arc::new(table) }
    }

    pub fn table(&self) -> &HandlerTable {
        &self.table
    }

    pub async fn handle(&self, message: BridgeMessage) -> BridgeReply {
        self.table.invoke(&message.handler_id, message.contexts).await
    }

    /// Serve `inbox` until every sender is gone. Each message is handled on
    /// its own task so a slow handler does not hold up the next message.
    pub fn spawn(self, mut inbox: Inbox) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(incoming) = inbox.recv().await {
                let receiver = self.clone();
                tokio::spawn(async move {
                    let (message, responder) = incoming.into_parts();
                    let handler_id = message.handler_id.clone();
                    let reply = receiver.handle(message).await;
                    if responder.send(Ok(reply)).is_err() {
                        log::debug!("Sender of {} stopped waiting for the reply", handler_id);
                    }
                });
            }
            log::debug!("Bridge receiver inbox closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::message::ReplyStatus;
    use crate::context::{HeaderMap, RawBody, RequestContext, ResponseContext};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Worker {
        calls: AtomicUsize,
    }

    impl Worker {
        fn on_sync(this: &Arc<Self>, _: Exchange) -> Result<HandlerReturn, HandlerError> {
            this.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerReturn::Done)
        }
    }

    impl RemoteClass for Worker {
        fn class_alias() -> &'static str {
            "Handlers"
        }

        fn remote_methods(methods: &mut RemoteMethods<Self>) {
            methods
                .method("onSync", Worker::on_sync)
                .method("onAsync", |this, exchange| {
                    let this = Arc::clone(this);
                    Ok(HandlerReturn::deferred(async move {
                        this.calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(json!({"path": exchange.request().path()})))
                    }))
                })
                .method("onFail", |_, _| Err(HandlerError::other("boom")))
                .method("onPanic", |_, _| panic!("handler exploded"));
        }
    }

    fn exchange() -> Exchange {
        Exchange::new(
            RequestContext::new("GET", "/p", HeaderMap::new(), &RawBody::Empty),
            ResponseContext::new(200, HeaderMap::new(), &RawBody::Empty),
        )
    }

    fn table() -> (HandlerTable, Arc<Worker>) {
        let worker = Arc::new(Worker::default());
        let mut table = HandlerTable::new();
        assert_eq!(table.register(Arc::clone(&worker)), 4);
        (table, worker)
    }

    #[tokio::test]
    async fn test_reply_statuses() {
        let (table, worker) = table();

        assert_eq!(table.invoke("Handlers:onSync", exchange()).await, BridgeReply::ok(None));

        let reply = table.invoke("Handlers:onAsync", exchange()).await;
        assert_eq!(reply.value, Some(json!({"path": "/p"})));
        assert_eq!(worker.calls.load(Ordering::SeqCst), 2);

        let reply = table.invoke("Handlers:onFail", exchange()).await;
        assert_eq!(reply.status, ReplyStatus::Error);
        assert_eq!(reply.error.as_deref(), Some("boom"));

        let reply = table.invoke("Handlers:onPanic", exchange()).await;
        assert_eq!(reply.status, ReplyStatus::Error);

        assert_eq!(table.invoke("Handlers:missing", exchange()).await, BridgeReply::not_found());
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first() {
        let (mut table, _) = table();
        assert_eq!(table.register(Arc::new(Worker::default())), 0);
        assert_eq!(table.len(), 4);
        assert_eq!(table.ids()[0], "Handlers:onSync");
    }
}
