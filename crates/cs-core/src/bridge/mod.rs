//! Cross-context bridge.
//!
//! Three hops connect the capturing context to the handler bodies:
//!
//! ```text
//! page (BridgeClient) --port--> relay --port--> worker (BridgeReceiver)
//! ```
//!
//! Every hop moves plain serializable data. The relay forwards well-shaped
//! dispatch envelopes and nothing else. The receiver resolves the handler id
//! against a table built once at startup and answers with a [`BridgeReply`].
//!
//! Only the envelope types are available without the `runtime` feature; the
//! channel port, relay, receiver and client need tokio.

pub mod message;

#[cfg(feature = "runtime")]
pub mod client;
#[cfg(feature = "runtime")]
pub mod port;
#[cfg(feature = "runtime")]
pub mod receiver;
#[cfg(feature = "runtime")]
pub mod relay;

pub use message::{BridgeMessage, BridgeReply, MessageKind, ReplyStatus};

#[cfg(feature = "runtime")]
pub use client::{BridgeClient, BridgeConfig};
#[cfg(feature = "runtime")]
pub use port::{channel, Inbox, Incoming, PortSender};
#[cfg(feature = "runtime")]
pub use receiver::{BridgeReceiver, HandlerReturn, HandlerTable, RemoteClass, RemoteMethods};
#[cfg(feature = "runtime")]
pub use relay::spawn_relay;
