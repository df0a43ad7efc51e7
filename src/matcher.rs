//! Pure(ish) translation from an inbound [`Event`] to zero or more inflights
//! that it resolves, per the rules table in §4.2 of the specification.
//!
//! "Pure-ish" because hydrating the entity an event refers to requires a
//! database read — but the control flow here never mutates anything, and the
//! fast path (P3) ensures a namespace with nothing waiting costs zero reads.

use std::sync::Arc;

use crate::db::Database;
use crate::error::BridgeError;
use crate::event::{Event, EventType};
use crate::model::{Message, RequestKind, TokenPool, TokenTransfer};
use crate::registry::{Inflight, InflightRegistry};

/// One inflight matched against an incoming event, paired with the outcome
/// it should be resolved with.
pub struct Matched {
    pub inflight: Arc<Inflight>,
    pub outcome: Outcome,
}

/// What a matched event means for the inflight it resolves, carrying
/// whatever entity the matcher already had to fetch to get here so the
/// resolver never re-reads it. Building the actual caller-visible payload
/// (e.g. loading a reply's data rows) is still the
/// [`crate::resolver::Resolver`]'s job.
pub enum Outcome {
    MessageConfirmed(Message),
    MessageReplied(Message),
    MessageRejected,
    PoolConfirmed(TokenPool),
    PoolRejected(TokenPool),
    TransferConfirmed(TokenTransfer),
    TransferFailed,
}

/// Matches `event` against `registry`, returning every inflight it resolves.
/// Per the rules table, only `MessageConfirmed` can ever return more than one
/// match (a reply-waiter and a confirm-waiter, independently, per P4).
pub async fn match_event(
    event: &Event,
    registry: &InflightRegistry,
    db: &dyn Database,
) -> Result<Vec<Matched>, BridgeError> {
    // P3: zero database reads when nothing in this namespace is waiting.
    if registry.is_namespace_empty(&event.namespace).await {
        return Ok(Vec::new());
    }

    match &event.event_type {
        EventType::MessageConfirmed => match_message_confirmed(event, registry, db).await,
        EventType::MessageRejected => {
            match_simple(event, registry, RequestKind::MessageConfirm, Outcome::MessageRejected).await
        }
        EventType::PoolConfirmed => match_token_pool(event, registry, db, Outcome::PoolConfirmed).await,
        EventType::PoolRejected => match_token_pool(event, registry, db, Outcome::PoolRejected).await,
        EventType::TransferConfirmed => match_token_transfer_confirmed(event, registry, db).await,
        EventType::TransferOpFailed => match_transfer_op_failed(event, registry, db).await,
        EventType::Other(kind) => {
            tracing::debug!(event_type = %kind, "no matcher rule for event type, ignoring");
            Ok(Vec::new())
        }
    }
}

/// Looks up a single inflight by `event.reference` under `kind` and, if
/// present, pairs it with `outcome`. Used by every rule whose reference id
/// equals the entity's own id (rejections and simple confirmations).
async fn match_simple(
    event: &Event,
    registry: &InflightRegistry,
    kind: RequestKind,
    outcome: Outcome,
) -> Result<Vec<Matched>, BridgeError> {
    match registry.get(&event.namespace, kind, &event.reference).await {
        Some(inflight) => Ok(vec![Matched { inflight, outcome }]),
        None => Ok(Vec::new()),
    }
}

/// Shared by `PoolConfirmed` and `PoolRejected`: fetches the token pool the
/// event refers to and, if an inflight is waiting on it, pairs it with
/// `outcome` applied to the fetched row.
async fn match_token_pool(
    event: &Event,
    registry: &InflightRegistry,
    db: &dyn Database,
    outcome: impl FnOnce(TokenPool) -> Outcome,
) -> Result<Vec<Matched>, BridgeError> {
    let Some(pool) = db.get_token_pool_by_id(&event.reference).await? else {
        tracing::debug!(id = %event.reference, "pool event referenced a token pool the database doesn't have");
        return Ok(Vec::new());
    };

    match registry
        .get(&event.namespace, RequestKind::TokenPoolConfirm, &pool.id)
        .await
    {
        Some(inflight) => Ok(vec![Matched {
            inflight,
            outcome: outcome(pool),
        }]),
        None => Ok(Vec::new()),
    }
}

async fn match_token_transfer_confirmed(
    event: &Event,
    registry: &InflightRegistry,
    db: &dyn Database,
) -> Result<Vec<Matched>, BridgeError> {
    let Some(transfer) = db.get_token_transfer(&event.reference).await? else {
        tracing::debug!(id = %event.reference, "TransferConfirmed referenced a token transfer the database doesn't have");
        return Ok(Vec::new());
    };

    match registry
        .get(&event.namespace, RequestKind::TokenTransferConfirm, &transfer.local_id)
        .await
    {
        Some(inflight) => Ok(vec![Matched {
            inflight,
            outcome: Outcome::TransferConfirmed(transfer),
        }]),
        None => Ok(Vec::new()),
    }
}

async fn match_message_confirmed(
    event: &Event,
    registry: &InflightRegistry,
    db: &dyn Database,
) -> Result<Vec<Matched>, BridgeError> {
    let Some(message) = db.get_message_by_id(&event.reference).await? else {
        // Entity-not-found: logged and dropped, not an error (§9 open question,
        // resolved as an explicit policy). The caller will eventually time out.
        tracing::debug!(id = %event.reference, "MessageConfirmed referenced a message the database doesn't have");
        return Ok(Vec::new());
    };

    let mut matches = Vec::new();

    if let Some(correlation_id) = &message.correlation_id {
        if let Some(inflight) = registry
            .get(&event.namespace, RequestKind::MessageReply, correlation_id)
            .await
        {
            matches.push(Matched {
                inflight,
                outcome: Outcome::MessageReplied(message.clone()),
            });
        }
    }

    if let Some(inflight) = registry
        .get(&event.namespace, RequestKind::MessageConfirm, &message.id)
        .await
    {
        matches.push(Matched {
            inflight,
            outcome: Outcome::MessageConfirmed(message.clone()),
        });
    }

    Ok(matches)
}

async fn match_transfer_op_failed(
    event: &Event,
    registry: &InflightRegistry,
    db: &dyn Database,
) -> Result<Vec<Matched>, BridgeError> {
    let Some(operation) = db.get_operation_by_id(&event.reference).await? else {
        tracing::debug!(id = %event.reference, "TransferOpFailed referenced an operation the database doesn't have");
        return Ok(Vec::new());
    };

    let Some(local_id) = operation.transfer_local_id() else {
        tracing::warn!(operation = %operation.id, "TransferOpFailed operation has no decodable transfer local id");
        return Ok(Vec::new());
    };

    match registry
        .get(&event.namespace, RequestKind::TokenTransferConfirm, local_id)
        .await
    {
        Some(inflight) => Ok(vec![Matched {
            inflight,
            outcome: Outcome::TransferFailed,
        }]),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::db::Database;
    use crate::error::BridgeError;
    use crate::event::{self, EventBus, NamespaceListener};
    use crate::model::{Data, Operation};

    #[derive(Default)]
    struct StubDb {
        messages: HashMap<String, Message>,
        pools: HashMap<String, TokenPool>,
        transfers: HashMap<String, TokenTransfer>,
    }

    #[async_trait]
    impl Database for StubDb {
        async fn get_message_by_id(&self, id: &str) -> Result<Option<Message>, BridgeError> {
            Ok(self.messages.get(id).cloned())
        }

        async fn get_token_pool_by_id(&self, id: &str) -> Result<Option<TokenPool>, BridgeError> {
            Ok(self.pools.get(id).cloned())
        }

        async fn get_token_transfer(&self, local_id: &str) -> Result<Option<TokenTransfer>, BridgeError> {
            Ok(self.transfers.get(local_id).cloned())
        }

        async fn get_operation_by_id(&self, _id: &str) -> Result<Option<Operation>, BridgeError> {
            Ok(None)
        }

        async fn get_message_data(&self, _message: &Message, _inline: bool) -> Result<Vec<Data>, BridgeError> {
            Ok(Vec::new())
        }
    }

    /// No-op bus: these tests drive `match_event` directly and never need the
    /// listener the registry attaches on first `add`.
    struct StubBus;

    #[async_trait]
    impl EventBus for StubBus {
        async fn add_namespace_listener(
            &self,
            _namespace: &str,
            _callback: NamespaceListener,
        ) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    fn noop_listener() -> NamespaceListener {
        event::listener(|_event| async { Ok(()) })
    }

    async fn registry_with(namespace: &str, id: &str, kind: RequestKind) -> InflightRegistry {
        let registry = InflightRegistry::new();
        registry.attach_bus(Arc::new(StubBus));
        registry.add(namespace, id, kind, noop_listener()).await.unwrap();
        registry
    }

    fn make_event(event_type: EventType, namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_namespace_never_touches_the_database() {
        let registry = InflightRegistry::new();
        // No db methods are implemented to succeed; a lock-free, read-free
        // empty `StubDb` still must not be reached (P3).
        let db = StubDb::default();

        let matches = match_event(&make_event(EventType::MessageConfirmed, "ns1", "msg-1"), &registry, &db)
            .await
            .unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn message_confirmed_matches_the_confirm_waiter() {
        let registry = registry_with("ns1", "msg-1", RequestKind::MessageConfirm).await;
        let mut db = StubDb::default();
        db.messages.insert(
            "msg-1".into(),
            Message {
                id: "msg-1".into(),
                namespace: "ns1".into(),
                correlation_id: None,
            },
        );

        let matches = match_event(&make_event(EventType::MessageConfirmed, "ns1", "msg-1"), &registry, &db)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert!(matches!(matches[0].outcome, Outcome::MessageConfirmed(_)));
    }

    #[tokio::test]
    async fn message_confirmed_for_unknown_message_is_dropped() {
        let registry = registry_with("ns1", "msg-1", RequestKind::MessageConfirm).await;
        let db = StubDb::default();

        let matches = match_event(&make_event(EventType::MessageConfirmed, "ns1", "msg-1"), &registry, &db)
            .await
            .unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn pool_confirmed_hydrates_the_pool_before_matching() {
        let registry = registry_with("ns1", "pool-1", RequestKind::TokenPoolConfirm).await;
        let mut db = StubDb::default();
        db.pools.insert(
            "pool-1".into(),
            TokenPool {
                id: "pool-1".into(),
                namespace: "ns1".into(),
            },
        );

        let matches = match_event(&make_event(EventType::PoolConfirmed, "ns1", "pool-1"), &registry, &db)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        match &matches[0].outcome {
            Outcome::PoolConfirmed(pool) => assert_eq!(pool.id, "pool-1"),
            _ => panic!("expected PoolConfirmed, got a different outcome"),
        }
    }

    #[tokio::test]
    async fn pool_rejected_for_a_pool_the_database_lacks_is_dropped() {
        let registry = registry_with("ns1", "pool-1", RequestKind::TokenPoolConfirm).await;
        let db = StubDb::default();

        let matches = match_event(&make_event(EventType::PoolRejected, "ns1", "pool-1"), &registry, &db)
            .await
            .unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn transfer_confirmed_hydrates_the_transfer_before_matching() {
        let registry = registry_with("ns1", "local-1", RequestKind::TokenTransferConfirm).await;
        let mut db = StubDb::default();
        db.transfers.insert(
            "local-1".into(),
            TokenTransfer {
                local_id: "local-1".into(),
                namespace: "ns1".into(),
            },
        );

        let matches = match_event(&make_event(EventType::TransferConfirmed, "ns1", "local-1"), &registry, &db)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert!(matches!(&matches[0].outcome, Outcome::TransferConfirmed(transfer) if transfer.local_id == "local-1"));
    }
}
