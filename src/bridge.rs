//! The public entry point: wires a [`Database`] and an [`EventBus`] together
//! and exposes one `wait_for_*` method per [`RequestKind`].
//!
//! Construction is two-phase (§9): [`Bridge::new`] only needs the database,
//! so it can be built before the event bus exists; [`Bridge::attach`] wires
//! the bus in afterwards, breaking what would otherwise be a cyclic
//! dependency between the two.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::context::WaitContext;
use crate::db::Database;
use crate::error::BridgeError;
use crate::event::{self, EventBus, NamespaceListener};
use crate::matcher;
use crate::model::{InflightPayload, Message, MessageInOut, RequestKind, TokenPool, TokenTransfer};
use crate::registry::{InflightRegistry, InflightResponse};
use crate::resolver;

/// Tunable policy, separate from the wiring in [`Bridge`] itself so it can be
/// constructed once and handed to [`BridgeBuilder`] without also requiring a
/// database or event bus.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Used by callers that don't build their own [`WaitContext`].
    pub default_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(120),
        }
    }
}

/// Builds a [`Bridge`] with a non-default [`BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build(self, db: Arc<dyn Database>) -> Bridge {
        Bridge {
            db,
            registry: Arc::new(InflightRegistry::new()),
            config: self.config,
        }
    }
}

/// The sync/async correlation bridge. Cheap to clone (everything it owns is
/// behind an `Arc`); typically held as a single shared instance for the
/// process's lifetime.
#[derive(Clone)]
pub struct Bridge {
    db: Arc<dyn Database>,
    registry: Arc<InflightRegistry>,
    config: BridgeConfig,
}

impl Bridge {
    /// Constructs a bridge with default configuration. The event bus isn't
    /// needed yet — call [`Bridge::attach`] before the first `wait_for_*`
    /// call once it exists.
    pub fn new(db: Arc<dyn Database>) -> Self {
        BridgeBuilder::new().build(db)
    }

    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// A [`WaitContext`] with no cancellation, timed out at
    /// [`BridgeConfig::default_timeout`]. Convenience for callers that don't
    /// need a caller-supplied deadline or cancellation token.
    pub fn default_wait_context(&self) -> WaitContext {
        WaitContext::new(self.config.default_timeout)
    }

    /// Completes construction by wiring in the event bus. Must be called
    /// exactly once, before the first inflight is registered.
    pub fn attach(&self, event_bus: Arc<dyn EventBus>) {
        self.registry.attach_bus(event_bus);
    }

    /// Blocks until `id`'s message is confirmed or rejected, or `ctx` expires.
    /// `send` is invoked only after the inflight is registered, closing the
    /// race where a fast confirmation could otherwise arrive before anything
    /// was listening for it (§4.4 / P7).
    pub async fn wait_for_message<S, Fut>(
        &self,
        namespace: &str,
        id: &str,
        ctx: WaitContext,
        send: S,
    ) -> Result<Message, BridgeError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let response = self
            .send_and_wait(namespace, id, RequestKind::MessageConfirm, ctx, send)
            .await?;
        match response.outcome? {
            InflightPayload::Message(message) => Ok(message),
            other => Err(unexpected_payload("MessageConfirm", &other)),
        }
    }

    /// Blocks until a reply correlated to the outbound message `correlation_id`
    /// arrives, or `ctx` expires.
    pub async fn wait_for_reply<S, Fut>(
        &self,
        namespace: &str,
        correlation_id: &str,
        ctx: WaitContext,
        send: S,
    ) -> Result<MessageInOut, BridgeError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let response = self
            .send_and_wait(namespace, correlation_id, RequestKind::MessageReply, ctx, send)
            .await?;
        match response.outcome? {
            InflightPayload::MessageInOut(reply) => Ok(reply),
            other => Err(unexpected_payload("MessageReply", &other)),
        }
    }

    /// Blocks until token pool `id` is confirmed or rejected, or `ctx` expires.
    pub async fn wait_for_token_pool<S, Fut>(
        &self,
        namespace: &str,
        id: &str,
        ctx: WaitContext,
        send: S,
    ) -> Result<TokenPool, BridgeError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let response = self
            .send_and_wait(namespace, id, RequestKind::TokenPoolConfirm, ctx, send)
            .await?;
        match response.outcome? {
            InflightPayload::TokenPool(pool) => Ok(pool),
            other => Err(unexpected_payload("TokenPoolConfirm", &other)),
        }
    }

    /// Blocks until the token transfer whose local id is `local_id` is
    /// confirmed or the operation that submitted it fails, or `ctx` expires.
    pub async fn wait_for_token_transfer<S, Fut>(
        &self,
        namespace: &str,
        local_id: &str,
        ctx: WaitContext,
        send: S,
    ) -> Result<TokenTransfer, BridgeError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let response = self
            .send_and_wait(namespace, local_id, RequestKind::TokenTransferConfirm, ctx, send)
            .await?;
        match response.outcome? {
            InflightPayload::TokenTransfer(transfer) => Ok(transfer),
            other => Err(unexpected_payload("TokenTransferConfirm", &other)),
        }
    }

    /// The shared core every `wait_for_*` method wraps: register an inflight,
    /// invoke `send`, race the resolution against the deadline and
    /// cancellation in `ctx`, and guarantee the inflight is removed from the
    /// registry on every exit path (P2).
    async fn send_and_wait<S, Fut>(
        &self,
        namespace: &str,
        id: &str,
        kind: RequestKind,
        ctx: WaitContext,
        send: S,
    ) -> Result<InflightResponse, BridgeError>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let rx = self
            .registry
            .add(namespace, id, kind, self.dispatch_listener())
            .await?;

        // Disarmed right before the explicit `remove` below on every path;
        // only fires if this future is dropped (cancelled/panicked) before
        // that point, which `tokio::select!` below can otherwise do.
        let mut guard = InflightGuard::new(self.registry.clone(), namespace.to_string(), id.to_string());
        let start = tokio::time::Instant::now();

        if let Err(err) = send().await {
            self.registry.remove(namespace, id).await;
            guard.disarm();
            return Err(BridgeError::Send(err));
        }

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                Err(BridgeError::RequestTimeout { id: id.to_string(), elapsed_ms: elapsed_ms(start) })
            }
            _ = tokio::time::sleep(ctx.timeout()) => {
                Err(BridgeError::RequestTimeout { id: id.to_string(), elapsed_ms: elapsed_ms(start) })
            }
            recv = rx => {
                recv.map_err(|_| BridgeError::Internal(
                    "inflight response sender dropped without resolving".into(),
                ))
            }
        };

        self.registry.remove(namespace, id).await;
        guard.disarm();

        outcome
    }

    /// Builds the callback passed to `EventBus::add_namespace_listener`,
    /// shared by every namespace the registry ever attaches. Cloning the
    /// registry and database `Arc`s into the closure, rather than capturing
    /// `self`, keeps the listener's lifetime independent of any one
    /// `wait_for_*` call.
    fn dispatch_listener(&self) -> NamespaceListener {
        let registry = self.registry.clone();
        let db = self.db.clone();
        event::listener(move |incoming| {
            let registry = registry.clone();
            let db = db.clone();
            async move {
                let matches = matcher::match_event(&incoming, &registry, db.as_ref()).await?;
                resolver::resolve_all(matches, db).await;
                Ok(())
            }
        })
    }
}

fn elapsed_ms(start: tokio::time::Instant) -> u64 {
    start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

fn unexpected_payload(expected_kind: &'static str, got: &InflightPayload) -> BridgeError {
    BridgeError::Internal(format!(
        "resolved a {expected_kind} wait with a mismatched payload: {got:?}"
    ))
}

/// Panic-safety net for [`Bridge::send_and_wait`]: `remove`s the inflight on
/// drop unless [`InflightGuard::disarm`] was called first. Covers the case
/// where the enclosing future is dropped or panics before the normal,
/// always-awaited cleanup runs; does not replace that cleanup; the async
/// removal it spawns is best-effort only (the process may already be
/// unwinding).
struct InflightGuard {
    registry: Arc<InflightRegistry>,
    namespace: String,
    id: String,
    armed: bool,
}

impl InflightGuard {
    fn new(registry: Arc<InflightRegistry>, namespace: String, id: String) -> Self {
        Self {
            registry,
            namespace,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = self.registry.clone();
        let namespace = std::mem::take(&mut self.namespace);
        let id = std::mem::take(&mut self.id);
        tokio::spawn(async move {
            registry.remove(&namespace, &id).await;
        });
    }
}
