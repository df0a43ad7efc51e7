//! Turns a [`crate::matcher::Matched`] into a concrete [`InflightPayload`] or
//! [`BridgeError`] and delivers it through the inflight's response slot.
//!
//! Resolution is fire-and-forget from the event bus's point of view: each
//! match is handed its own spawned task so a slow or stuck waiter can never
//! hold up delivery of the next event, and so two matches produced by the
//! same event (a reply-waiter and a confirm-waiter, per P4) resolve
//! independently of one another.

use std::sync::Arc;

use crate::db::Database;
use crate::error::BridgeError;
use crate::matcher::{Matched, Outcome};
use crate::model::{InflightPayload, MessageInOut};
use crate::registry::{Inflight, InflightResponse};

/// Resolves every match produced for one event, spawning a task per match.
/// `db` is cloned (as an `Arc`) into each task since building a
/// `MessageInOut` reply needs a further read for the message's data rows.
pub async fn resolve_all(matches: Vec<Matched>, db: Arc<dyn Database>) {
    for matched in matches {
        let db = db.clone();
        tokio::spawn(async move {
            resolve_one(matched, db.as_ref()).await;
        });
    }
}

async fn resolve_one(matched: Matched, db: &dyn Database) {
    let Matched { inflight, outcome } = matched;
    let response_id = response_id(&outcome, &inflight);
    let outcome = build_outcome(&inflight, outcome, db).await;

    let delivered = inflight.resolve(InflightResponse {
        id: response_id,
        outcome,
    });

    if !delivered {
        tracing::debug!(
            namespace = %inflight.namespace,
            id = %inflight.id,
            "resolution raced a timeout or duplicate delivery and was dropped",
        );
    }
}

/// The id to report in the response: normally the inflight's own id, except
/// a reply resolution reports the reply message's own id rather than the
/// correlation id the inflight was keyed by.
fn response_id(outcome: &Outcome, inflight: &Inflight) -> String {
    match outcome {
        Outcome::MessageReplied(message) => message.id.clone(),
        Outcome::PoolConfirmed(pool) | Outcome::PoolRejected(pool) => pool.id.clone(),
        Outcome::TransferConfirmed(transfer) => transfer.local_id.clone(),
        _ => inflight.id.clone(),
    }
}

async fn build_outcome(
    inflight: &Inflight,
    outcome: Outcome,
    db: &dyn Database,
) -> Result<InflightPayload, BridgeError> {
    match outcome {
        Outcome::MessageConfirmed(message) => Ok(InflightPayload::Message(message)),
        Outcome::MessageReplied(message) => {
            let data = db.get_message_data(&message, true).await?;
            Ok(InflightPayload::MessageInOut(MessageInOut { message, data }))
        }
        Outcome::MessageRejected => Err(BridgeError::MessageRejected {
            id: inflight.id.clone(),
        }),
        Outcome::PoolConfirmed(pool) => Ok(InflightPayload::TokenPool(pool)),
        Outcome::PoolRejected(pool) => Err(BridgeError::TokenPoolRejected { id: pool.id }),
        Outcome::TransferConfirmed(transfer) => Ok(InflightPayload::TokenTransfer(transfer)),
        Outcome::TransferFailed => Err(BridgeError::TokenTransferFailed {
            id: inflight.id.clone(),
        }),
    }
}
