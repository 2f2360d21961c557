//! In-process message port built on tokio channels.
//!
//! A port is a bounded mpsc queue of [`Incoming`] envelopes; each envelope
//! carries a oneshot responder so the receiving side can answer exactly once.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::message::{BridgeMessage, BridgeReply};
use crate::error::BridgeError;

pub type ReplyResult = Result<BridgeReply, BridgeError>;

/// A message together with the means to answer it.
#[derive(Debug)]
pub struct Incoming {
    pub message: BridgeMessage,
    responder: oneshot::Sender<ReplyResult>,
}

impl Incoming {
    /// Answer the sender. Returns `false` if the sender stopped waiting.
    pub fn respond(self, reply: ReplyResult) -> bool {
        self.responder.send(reply).is_ok()
    }

    pub fn into_parts(self) -> (BridgeMessage, oneshot::Sender<ReplyResult>) {
        (self.message, self.responder)
    }
}

/// Sending half of a port. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PortSender {
    tx: mpsc::Sender<Incoming>,
}

impl PortSender {
    /// Queue a message without waiting.
    pub fn post(&self, message: BridgeMessage) -> Result<PendingReply, BridgeError> {
        let (responder, reply) = oneshot::channel();
        self.tx
            .try_send(Incoming { message, responder })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BridgeError::Busy,
                mpsc::error::TrySendError::Closed(_) => BridgeError::Unreachable,
            })?;
        Ok(PendingReply { reply })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reply handle for a posted message.
#[derive(Debug)]
pub struct PendingReply {
    reply: oneshot::Receiver<ReplyResult>,
}

impl PendingReply {
    pub async fn wait(self) -> ReplyResult {
        self.reply.await.map_err(|_| BridgeError::ReplyDropped)?
    }

    pub async fn wait_timeout(self, timeout: Duration) -> ReplyResult {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

/// Receiving half of a port.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Incoming>,
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<Incoming> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

pub fn channel(capacity: usize) -> (PortSender, Inbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PortSender { tx }, Inbox { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::HandlerId;
    use crate::context::{Exchange, HeaderMap, RawBody, RequestContext, ResponseContext};

    fn message() -> BridgeMessage {
        let exchange = Exchange::new(
            RequestContext::new("GET", "/x", HeaderMap::new(), &RawBody::Empty),
            ResponseContext::new(200, HeaderMap::new(), &RawBody::Empty),
        );
        BridgeMessage::dispatch(&HandlerId::new("A", "b"), &exchange)
    }

    #[tokio::test]
    async fn test_post_and_respond() {
        let (tx, mut inbox) = channel(4);
        let pending = tx.post(message()).unwrap();
        let incoming = inbox.recv().await.unwrap();
        assert_eq!(incoming.message.handler_id, "A:b");
        assert!(incoming.respond(Ok(BridgeReply::ok(None))));
        assert!(pending.wait().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let (tx, inbox) = channel(1);
        drop(inbox);
        assert_eq!(tx.post(message()).unwrap_err(), BridgeError::Unreachable);
    }

    #[tokio::test]
    async fn test_full_port_is_busy() {
        let (tx, _inbox) = channel(1);
        let _first = tx.post(message()).unwrap();
        assert_eq!(tx.post(message()).unwrap_err(), BridgeError::Busy);
    }

    #[tokio::test]
    async fn test_dropped_responder() {
        let (tx, mut inbox) = channel(1);
        let pending = tx.post(message()).unwrap();
        drop(inbox.recv().await);
        assert_eq!(pending.wait().await.unwrap_err(), BridgeError::ReplyDropped);
    }
}
