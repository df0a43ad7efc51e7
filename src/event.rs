//! The inbound event-bus contract the bridge consumes.
//!
//! The event bus itself — how events are persisted, ordered, and delivered —
//! is an external collaborator (§1 of the specification this crate implements).
//! This module only defines the shape the bridge needs: a namespace-scoped
//! subscription and the event envelope it receives on that subscription.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::BridgeError;

/// The kinds of event the bridge's [`crate::matcher`] knows how to resolve
/// against an inflight request. Anything else is `Other` and is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    MessageConfirmed,
    MessageRejected,
    PoolConfirmed,
    PoolRejected,
    TransferConfirmed,
    TransferOpFailed,
    /// An event type the bridge has no rule for. Carries the raw type name
    /// for logging; the matcher always treats this as "no match".
    Other(String),
}

/// One event delivered from the event bus.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub namespace: String,
    /// The id of the entity this event refers to (a message, pool, transfer,
    /// or operation id, depending on `event_type`).
    pub reference: String,
}

/// A namespace-scoped event callback, registered once per namespace via
/// [`EventBus::add_namespace_listener`] and invoked for every event delivered
/// on that namespace for the lifetime of the process.
///
/// Returning `Ok(())` covers every recoverable outcome, including "no match"
/// and "entity not found" — the bridge never propagates those to the bus.
/// Returning `Err` signals a fatal condition (e.g. the bus's backing store is
/// gone) and may cause the bus to stop delivering to this namespace.
pub type NamespaceListener =
    Arc<dyn Fn(Event) -> BoxFuture<'static, Result<(), BridgeError>> + Send + Sync>;

/// The event bus as the bridge sees it: a place to lazily attach one listener
/// per namespace. Implemented by the node's real event bus in production and
/// by an in-memory double in tests.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Subscribes `callback` to every event delivered on `namespace`. The
    /// bridge calls this at most once per namespace (invariant I5); a second
    /// call for the same namespace must not happen and implementations are
    /// free to assume it won't.
    async fn add_namespace_listener(
        &self,
        namespace: &str,
        callback: NamespaceListener,
    ) -> Result<(), BridgeError>;
}

/// Boxes an async closure into a [`NamespaceListener`]. Small helper so
/// callers (and the bridge itself, wiring its own dispatch callback) don't
/// repeat the `Arc::new(move |event| Box::pin(...))` boilerplate.
pub fn listener<F, Fut>(f: F) -> NamespaceListener
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BridgeError>> + Send + 'static,
{
    Arc::new(move |event: Event| -> BoxFuture<'static, Result<(), BridgeError>> { Box::pin(f(event)) })
}
