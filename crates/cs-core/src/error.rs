//! Error types shared across the engine.

/// Error raised by a handler body.
///
/// Handler errors never escape the dispatch loop; they are logged per entry.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler panicked: {0}")]
    Panicked(String),
    #[error("Payload missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Bridge unavailable: {0}")]
    Bridge(#[from] BridgeError),
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Error raised while moving a message across the context boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Receiving end unreachable")]
    Unreachable,
    #[error("Port queue full")]
    Busy,
    #[error("No reply within {0} ms")]
    Timeout(u64),
    #[error("Reply channel dropped before the handler settled")]
    ReplyDropped,
    #[error("Malformed envelope: {0}")]
    Malformed(String),
    #[error("No remote transport configured")]
    NoTransport,
}

/// Failure of the underlying HTTP primitive. Always propagated to the caller
/// untouched; the interceptor never swallows these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Network error: {0}")]
pub struct NetworkError(pub String);
