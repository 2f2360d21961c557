//! Pattern registry and dispatch loop.
//!
//! The registry holds two tables:
//! - pending declarations, keyed by handler class, waiting for an instance
//! - bound entries, in registration order, each tied to one instance
//!
//! Only bound entries take part in matching. Locks guard the tables but are
//! never held while a handler body or the transport runs, so a handler may
//! call back into the registry.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::binding::{
    Declarations, DispatchMode, HandlerClass, HandlerFn, HandlerId, RemoteTransport,
};
use crate::bridge::message::BridgeMessage;
use crate::context::{Exchange, RequestContext, ResponseContext};
use crate::error::{BridgeError, HandlerError};
use crate::pattern::UrlPattern;

type LocalInvoke = Arc<dyn Fn(&Exchange) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Clone)]
enum Target {
    Local(LocalInvoke),
    Remote,
}

struct BoundEntry {
    pattern: UrlPattern,
    id: HandlerId,
    target: Target,
}

struct PendingClass {
    class_alias: &'static str,
    count: usize,
    /// `Declarations<C>` for the class keyed by `TypeId::of::<C>()`.
    declarations: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct Pending {
    /// Classes whose `declare` hook already ran.
    loaded: HashSet<TypeId>,
    classes: HashMap<TypeId, PendingClass>,
}

/// Outcome counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub matched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct PatternRegistry {
    pending: Mutex<Pending>,
    bound: RwLock<Vec<BoundEntry>>,
    transport: RwLock<Option<Arc<dyn RemoteTransport>>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `C::declare` the first time `C` is seen. Returns the number of
    /// declarations added to the pending table.
    pub fn declare_class<C: HandlerClass>(&self) -> usize {
        {
            let mut pending = lock(&self.pending);
            if !pending.loaded.insert(TypeId::of::<C>()) {
                return 0;
            }
        }
        let mut declarations = Declarations::<C>::new();
        C::declare(&mut declarations);
        let added = declarations.len();
        self.merge_pending(declarations);
        log::debug!("Declared {} pattern(s) for {}", added, C::class_alias());
        added
    }

    /// Add one pending declaration for class `C`. Declaring an identical
    /// `(pattern, method)` pair again has no effect.
    pub fn register<C: HandlerClass>(
        &self,
        pattern: UrlPattern,
        method: &str,
        mode: DispatchMode,
        handler: Option<HandlerFn<C>>,
    ) {
        let mut declarations = Declarations::<C>::new();
        declarations.push(pattern, method, mode, handler);
        self.merge_pending(declarations);
    }

    fn merge_pending<C: HandlerClass>(&self, declarations: Declarations<C>) {
        let mut pending = lock(&self.pending);
        let slot = pending
            .classes
            .entry(TypeId::of::<C>())
            .or_insert_with(|| PendingClass {
                class_alias: C::class_alias(),
                count: 0,
                declarations: Box::new(Declarations::<C>::new()),
            });
        if let Some(existing) = slot.declarations.downcast_mut::<Declarations<C>>() {
            existing.append(declarations);
            slot.count = existing.len();
        }
    }

    /// Promote every pending declaration of `C` into a bound entry invoking
    /// `instance`, then clear them. Returns the number of entries bound.
    ///
    /// Binding a second instance of the same class adds nothing unless new
    /// declarations were registered in between.
    pub fn bind<C: HandlerClass>(&self, instance: Arc<C>) -> usize {
        self.declare_class::<C>();

        let taken = lock(&self.pending).classes.remove(&TypeId::of::<C>());
        let declarations = match taken.map(|p| p.declarations.downcast::<Declarations<C>>()) {
            Some(Ok(declarations)) => declarations.into_entries(),
            Some(Err(_)) | None => return 0,
        };

        let class_alias = C::class_alias();
        let mut entries = Vec::with_capacity(declarations.len());
        for decl in declarations {
            let id = HandlerId::new(class_alias, decl.method_alias());
            let target = match (decl.mode, decl.handler) {
                (DispatchMode::Remote, _) => Target::Remote,
                (DispatchMode::Local, Some(handler)) => {
                    let instance = Arc::clone(&instance);
                    Target::Local(Arc::new(move |exchange: &Exchange| handler(&instance, exchange)))
                }
                (DispatchMode::Local, None) => {
                    log::warn!("{} declared as local without a handler body; skipped", id);
                    continue;
                }
            };
            log::debug!("Bound {} -> {}", decl.pattern, id);
            entries.push(BoundEntry { pattern: decl.pattern, id, target });
        }

        let count = entries.len();
        write(&self.bound).extend(entries);
        count
    }

    /// Whether any bound entry matches `url`. Pending declarations do not count.
    #[inline]
    pub fn matches(&self, url: &str) -> bool {
        read(&self.bound).iter().any(|entry| entry.pattern.matches(url))
    }

    /// Invoke every bound entry whose pattern matches the request URL, in
    /// registration order. A failing or panicking handler is logged and does
    /// not stop the remaining ones.
    pub fn dispatch(
        &self,
        request_context: RequestContext,
        response_context: ResponseContext,
    ) -> DispatchReport {
        let targets: Vec<(HandlerId, Target)> = {
            let url = request_context.path();
            read(&self.bound)
                .iter()
                .filter(|entry| entry.pattern.matches(url))
                .map(|entry| (entry.id.clone(), entry.target.clone()))
                .collect()
        };

        let mut report = DispatchReport {
            matched: targets.len(),
            ..DispatchReport::default()
        };
        if targets.is_empty() {
            return report;
        }

        let exchange = Exchange::new(request_context, response_context);
        for (id, target) in targets {
            let outcome = catch_unwind(AssertUnwindSafe(|| match &target {
                Target::Local(invoke) => invoke(&exchange),
                Target::Remote => self.transmit(&id, &exchange),
            }));
            let result = outcome.unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic))));
            match result {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    log::error!("Handler {} failed for {}: {}", id, exchange.request().path(), e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn transmit(&self, id: &HandlerId, exchange: &Exchange) -> Result<(), HandlerError> {
        let transport = read(&self.transport).clone();
        let transport = transport.ok_or(BridgeError::NoTransport)?;
        transport.transmit(BridgeMessage::dispatch(id, exchange))?;
        Ok(())
    }

    pub fn set_remote_transport(&self, transport: Arc<dyn RemoteTransport>) {
        *write(&self.transport) = Some(transport);
    }

    pub fn clear_remote_transport(&self) {
        *write(&self.transport) = None;
    }

    /// Drop every bound entry and pending declaration, and forget which
    /// classes were declared.
    pub fn reset(&self) {
        *lock(&self.pending) = Pending::default();
        write(&self.bound).clear();
    }

    pub fn bound_len(&self) -> usize {
        read(&self.bound).len()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).classes.values().map(|c| c.count).sum()
    }

    /// Class aliases with declarations still waiting for an instance.
    pub fn pending_classes(&self) -> Vec<&'static str> {
        let mut aliases: Vec<_> = lock(&self.pending).classes.values().map(|c| c.class_alias).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Bound handler ids with their patterns, in registration order.
    pub fn bound_handlers(&self) -> Vec<(HandlerId, UrlPattern, DispatchMode)> {
        read(&self.bound)
            .iter()
            .map(|entry| {
                let mode = match entry.target {
                    Target::Local(_) => DispatchMode::Local,
                    Target::Remote => DispatchMode::Remote,
                };
                (entry.id.clone(), entry.pattern.clone(), mode)
            })
            .collect()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
