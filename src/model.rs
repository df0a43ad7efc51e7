//! Domain entities the bridge hydrates from the database and hands back to
//! waiting callers. These shapes are intentionally thin — the bridge only
//! reads the fields it needs to correlate and resolve requests; the rest of
//! an entity's data is out of scope (owned by the durable database).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a caller is waiting for. Closed set — see the rules table in
/// [`crate::matcher`] for which [`crate::event::EventType`] resolves which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Waiting for the message identified by `id` to be confirmed or rejected.
    MessageConfirm,
    /// Waiting for a reply correlated to the outbound message identified by `id`.
    MessageReply,
    /// Waiting for the token pool identified by `id` to be confirmed or rejected.
    TokenPoolConfirm,
    /// Waiting for the token transfer whose local id is `id` to be confirmed or failed.
    TokenTransferConfirm,
}

/// A message as persisted by the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub namespace: String,
    /// Present on reply messages: the id of the message this one replies to.
    pub correlation_id: Option<String>,
}

/// One data row attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Data {
    pub id: String,
    pub namespace: String,
    pub value: Value,
}

/// A message plus its inlined data, delivered for a [`RequestKind::MessageReply`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageInOut {
    pub message: Message,
    pub data: Vec<Data>,
}

/// A fungible or non-fungible token pool as defined by the token connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPool {
    pub id: String,
    pub namespace: String,
}

/// A token transfer awaiting network confirmation, keyed by the id this node
/// assigned it before broadcasting (`local_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenTransfer {
    pub local_id: String,
    pub namespace: String,
}

/// A blockchain operation record. Its `input` carries the original request
/// parameters the operation was submitted with; for transfer operations this
/// is how a `TransferOpFailed` event is traced back to a `local_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    pub id: String,
    pub namespace: String,
    pub input: Value,
}

impl Operation {
    /// Decodes the transfer `local_id` this operation was submitted for, if
    /// `input` carries one. Entity hydration for `TransferOpFailed` events
    /// relies on this.
    pub fn transfer_local_id(&self) -> Option<&str> {
        self.input.get("localId").and_then(Value::as_str)
    }
}

/// The tagged variant carried in an [`crate::registry::Inflight`]'s response
/// slot on success. One variant per [`RequestKind`], so a waiter wrapper can
/// narrow to the payload it expects; a mismatch is a bridge bug, not a caller
/// error (see [`crate::error::BridgeError::Internal`]).
#[derive(Debug, Clone)]
pub enum InflightPayload {
    Message(Message),
    MessageInOut(MessageInOut),
    TokenPool(TokenPool),
    TokenTransfer(TokenTransfer),
}
