//! Forward-only relay between two ports.

use tokio::task::JoinHandle;

use super::port::{Inbox, PortSender};

/// Forward every well-shaped dispatch envelope from `inbox` to `upstream`,
/// piping the upstream reply back. Malformed envelopes are answered with the
/// validation error and go no further.
///
/// The task ends when every sender feeding `inbox` is dropped.
pub fn spawn_relay(mut inbox: Inbox, upstream: PortSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(incoming) = inbox.recv().await {
            let (message, responder) = incoming.into_parts();
            if let Err(e) = message.validate() {
                log::debug!("Relay dropped envelope: {}", e);
                let _ = responder.send(Err(e));
                continue;
            }

            match upstream.post(message) {
                Ok(pending) => {
                    tokio::spawn(async move {
                        let _ = responder.send(pending.wait().await);
                    });
                }
                Err(e) => {
                    log::warn!("Relay could not reach the worker: {}", e);
                    let _ = responder.send(Err(e));
                }
            }
        }
        log::debug!("Relay inbox closed");
    })
}
