//! Page-side bridge client.
//!
//! [`BridgeClient`] is the [`RemoteTransport`] the registry hands remote
//! matches to. `transmit` only queues; an outbox task delivers each message
//! over the port, waits for the reply with a timeout and retries once after a
//! short delay when the far side is unreachable.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::message::{BridgeMessage, BridgeReply, ReplyStatus};
use super::port::PortSender;
use crate::binding::RemoteTransport;
use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How long to wait for the receiver to settle a handler.
    pub reply_timeout: Duration,
    /// Pause before the single retry of an unreachable send.
    pub retry_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct BridgeClient {
    port: PortSender,
    config: BridgeConfig,
    outbox: mpsc::UnboundedSender<BridgeMessage>,
}

impl BridgeClient {
    /// Create the client and spawn its outbox task. The task ends once every
    /// clone of the client is dropped and the queue is drained.
    pub fn spawn(port: PortSender, config: BridgeConfig) -> (Self, JoinHandle<()>) {
        let (outbox, mut queue) = mpsc::unbounded_channel::<BridgeMessage>();
        let worker = Self::deliverer(port.clone(), config.clone());
        let handle = tokio::spawn(async move {
            let mut in_flight = Vec::new();
            while let Some(message) = queue.recv().await {
                let worker = worker.clone();
                in_flight.retain(|h: &JoinHandle<()>| !h.is_finished());
                in_flight.push(tokio::spawn(async move {
                    let handler_id = message.handler_id.clone();
                    match worker.send(message).await {
                        Ok(reply) if reply.status == ReplyStatus::Ok => {
                            log::debug!("{} settled", handler_id)
                        }
                        Ok(reply) => log::warn!(
                            "{} answered {:?}{}",
                            handler_id,
                            reply.status,
                            reply.error.map(|e| format!(": {}", e)).unwrap_or_default()
                        ),
                        Err(e) => log::error!("Abandoned {}: {}", handler_id, e),
                    }
                }));
            }
            for handle in in_flight {
                let _ = handle.await;
            }
        });
        (Self { port, config, outbox }, handle)
    }

    /// Delivery half shared by `send` and the outbox task.
    fn deliverer(port: PortSender, config: BridgeConfig) -> Deliverer {
        Deliverer { port, config }
    }

    /// Send one message and wait for its reply.
    pub async fn send(&self, message: BridgeMessage) -> Result<BridgeReply, BridgeError> {
        Self::deliverer(self.port.clone(), self.config.clone()).send(message).await
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl RemoteTransport for BridgeClient {
    fn transmit(&self, message: BridgeMessage) -> Result<(), BridgeError> {
        message.validate()?;
        self.outbox.send(message).map_err(|_| BridgeError::Unreachable)
    }
}

#[derive(Clone)]
struct Deliverer {
    port: PortSender,
    config: BridgeConfig,
}

impl Deliverer {
    async fn send(&self, message: BridgeMessage) -> Result<BridgeReply, BridgeError> {
        match self.attempt(message.clone()).await {
            Err(BridgeError::Unreachable) | Err(BridgeError::Busy) => {
                log::debug!(
                    "Receiver unreachable for {}; retrying in {:?}",
                    message.handler_id,
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
                self.attempt(message).await
            }
            other => other,
        }
    }

    async fn attempt(&self, message: BridgeMessage) -> Result<BridgeReply, BridgeError> {
        let pending = self.port.post(message)?;
        pending.wait_timeout(self.config.reply_timeout).await
    }
}
