//! Envelopes that cross the page / worker boundary.
//!
//! Everything here is plain data: a message carries a value copy of the
//! exchange, never a reference to the capturing side's objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::HandlerId;
use crate::context::Exchange;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "dispatch-to-remote")]
    DispatchToRemote,
}

/// Request to run a remote handler against a captured exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub handler_id: String,
    pub contexts: Exchange,
}

impl BridgeMessage {
    pub fn dispatch(handler_id: &HandlerId, exchange: &Exchange) -> Self {
        Self {
            kind: MessageKind::DispatchToRemote,
            handler_id: handler_id.to_string(),
            contexts: exchange.clone(),
        }
    }

    /// Decode an untyped envelope, rejecting anything that is not a dispatch.
    pub fn from_value(value: Value) -> Result<Self, BridgeError> {
        let message: Self =
            serde_json::from_value(value).map_err(|e| BridgeError::Malformed(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    pub fn from_json(text: &str) -> Result<Self, BridgeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BridgeError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> String {
        // Exchange is plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Envelope shape check applied by relays.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.handler_id.trim().is_empty() {
            return Err(BridgeError::Malformed("empty handlerId".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyStatus {
    Ok,
    Error,
    NotFound,
}

/// Receiver's answer to a [`BridgeMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeReply {
    pub fn ok(value: Option<Value>) -> Self {
        Self { status: ReplyStatus::Ok, value, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ReplyStatus::Error, value: None, error: Some(message.into()) }
    }

    pub fn not_found() -> Self {
        Self { status: ReplyStatus::NotFound, value: None, error: None }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}
