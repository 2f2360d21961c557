//! Handler classes and their declarations.
//!
//! A handler class states which URLs it cares about once, per type, through
//! [`HandlerClass::declare`]. Nothing is live until an instance is bound into a
//! [`PatternRegistry`](crate::registry::PatternRegistry); binding turns every
//! pending declaration into a bound entry that points at that instance.
//!
//! A declaration runs in one of two modes. `Local` calls the method on the
//! bound instance. `Remote` never runs a local body: the registry wraps the
//! exchange in a [`BridgeMessage`] addressed to `"<ClassAlias>:<MethodAlias>"`
//! and hands it to the configured [`RemoteTransport`].

use std::fmt;

use crate::bridge::message::BridgeMessage;
use crate::context::Exchange;
use crate::error::{BridgeError, HandlerError};
use crate::pattern::UrlPattern;

// =============================================================================
// Dispatch Mode / Handler Id
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Run the handler body where the match happened.
    Local,
    /// Forward the exchange across the bridge; the body runs on the other side.
    Remote,
}

/// Stable handler address: `"<ClassAlias>:<MethodAlias>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId {
    class_alias: String,
    method_alias: String,
}

impl HandlerId {
    pub fn new(class_alias: impl Into<String>, method_alias: impl Into<String>) -> Self {
        Self {
            class_alias: class_alias.into(),
            method_alias: method_alias.into(),
        }
    }

    /// Parse `"Class:method"`. Both halves must be non-empty.
    pub fn parse(id: &str) -> Option<Self> {
        let (class_alias, method_alias) = id.split_once(':')?;
        if class_alias.is_empty() || method_alias.is_empty() {
            return None;
        }
        Some(Self::new(class_alias, method_alias))
    }

    pub fn class_alias(&self) -> &str {
        &self.class_alias
    }

    pub fn method_alias(&self) -> &str {
        &self.method_alias
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_alias, self.method_alias)
    }
}

/// Last path segment of a type name, e.g. `LeetCodeApiHandlers`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// Remote Transport
// =============================================================================

/// Outbound side of the bridge as seen from the capturing context.
///
/// `transmit` must not block: implementations queue the message and deliver
/// it from their own task or event loop.
pub trait RemoteTransport: Send + Sync {
    fn transmit(&self, message: BridgeMessage) -> Result<(), BridgeError>;
}

// =============================================================================
// Declarations
// =============================================================================

/// Local handler body: a method on the bound instance.
pub type HandlerFn<C> = fn(&C, &Exchange) -> Result<(), HandlerError>;

pub struct Declaration<C> {
    pub(crate) pattern: UrlPattern,
    pub(crate) method: String,
    pub(crate) alias: Option<String>,
    pub(crate) mode: DispatchMode,
    pub(crate) handler: Option<HandlerFn<C>>,
}

impl<C> Declaration<C> {
    /// Override the method alias used in the handler id.
    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn method_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.method)
    }

    pub fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }
}

/// Builder collecting a class's declarations.
pub struct Declarations<C> {
    entries: Vec<Declaration<C>>,
}

impl<C> Default for Declarations<C> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<C> Declarations<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a locally executed handler.
    pub fn local(&mut self, pattern: UrlPattern, method: &str, handler: HandlerFn<C>) -> &mut Declaration<C> {
        self.push(pattern, method, DispatchMode::Local, Some(handler))
    }

    /// Declare a handler whose body lives on the other side of the bridge.
    pub fn remote(&mut self, pattern: UrlPattern, method: &str) -> &mut Declaration<C> {
        self.push(pattern, method, DispatchMode::Remote, None)
    }

    /// Add a declaration. An identical `(pattern, method)` pair is not added
    /// twice; the existing declaration is returned instead.
    pub fn push(
        &mut self,
        pattern: UrlPattern,
        method: &str,
        mode: DispatchMode,
        handler: Option<HandlerFn<C>>,
    ) -> &mut Declaration<C> {
        let existing = self
            .entries
            .iter()
            .position(|d| d.pattern == pattern && d.method == method);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.entries.push(Declaration {
                    pattern,
                    method: method.to_string(),
                    alias: None,
                    mode,
                    handler,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn append(&mut self, other: Declarations<C>) {
        for decl in other.entries {
            let Declaration { pattern, method, alias, mode, handler } = decl;
            let slot = self.push(pattern, &method, mode, handler);
            if alias.is_some() {
                slot.alias = alias;
            }
        }
    }

    pub(crate) fn into_entries(self) -> Vec<Declaration<C>> {
        self.entries
    }
}

// =============================================================================
// Handler Class
// =============================================================================

/// A type whose methods handle intercepted exchanges.
pub trait HandlerClass: Send + Sync + Sized + 'static {
    /// Alias used as the class half of remote handler ids.
    fn class_alias() -> &'static str {
        short_type_name::<Self>()
    }

    /// Record this class's interest patterns. Runs once per registry.
    fn declare(declarations: &mut Declarations<Self>);
}
