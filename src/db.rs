//! The inbound database contract the bridge consumes.
//!
//! The durable database itself is an external collaborator; this module only
//! defines the handful of read operations the [`crate::resolver::Resolver`]
//! and [`crate::matcher`] need to hydrate an event into a caller-visible
//! payload.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::model::{Data, Message, Operation, TokenPool, TokenTransfer};

/// Read-only database access the bridge needs to hydrate events into
/// payloads. Implemented by the node's real persistence layer in production
/// and by an in-memory double in tests.
#[async_trait]
pub trait Database: Send + Sync {
    async fn get_message_by_id(&self, id: &str) -> Result<Option<Message>, BridgeError>;

    async fn get_token_pool_by_id(&self, id: &str) -> Result<Option<TokenPool>, BridgeError>;

    async fn get_token_transfer(&self, local_id: &str) -> Result<Option<TokenTransfer>, BridgeError>;

    async fn get_operation_by_id(&self, id: &str) -> Result<Option<Operation>, BridgeError>;

    /// Loads the data rows attached to `message`. `inline` mirrors the
    /// source API's distinction between inline and by-reference data; the
    /// bridge always requests `inline = true` when building a
    /// [`crate::model::MessageInOut`] for a reply.
    async fn get_message_data(&self, message: &Message, inline: bool) -> Result<Vec<Data>, BridgeError>;
}
