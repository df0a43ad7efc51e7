//! The inflight table: a process-wide, namespace-partitioned map of blocked
//! requests, plus the lazy per-namespace event bus attachment that rides
//! along with it.
//!
//! A single async-aware mutex guards both the table and the set of
//! namespaces that have ever been attached (invariant I5). One lock buys two
//! correctness properties that would otherwise need careful coordination:
//! attach-then-insert is atomic (no request can slip in while a namespace's
//! listener is still being registered), and "does this namespace have any
//! inflights" is a consistent question to ask from the hot event-delivery
//! path (P3).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};

use crate::error::BridgeError;
use crate::event::{EventBus, NamespaceListener};
use crate::model::{InflightPayload, RequestKind};

/// The result delivered to a waiter through an inflight's response slot.
#[derive(Debug)]
pub struct InflightResponse {
    /// The id of the entity that resolved the request. Differs from the
    /// inflight's own `id` for a `MessageReply` (the reply message's id, not
    /// the correlation id that was being waited on).
    pub id: String,
    pub outcome: Result<InflightPayload, BridgeError>,
}

/// One blocked caller.
pub struct Inflight {
    pub id: String,
    pub kind: RequestKind,
    pub namespace: String,
    pub start: Instant,
    /// Capacity-1 rendezvous. `tokio::sync::oneshot::Sender::send` consumes
    /// the sender, so wrapping it in `Option` behind a plain sync mutex gives
    /// "send at most once" (I3) without any async machinery: the first
    /// resolver to `take()` the sender wins, every later one sees `None`.
    responder: SyncMutex<Option<oneshot::Sender<InflightResponse>>>,
}

impl Inflight {
    /// Delivers `response` if no prior resolver has already done so. Returns
    /// `false` if this resolution lost the race (or the receiver is gone) and
    /// was dropped — callers should log, not error, on `false`.
    pub fn resolve(&self, response: InflightResponse) -> bool {
        let Some(tx) = self.responder.lock().take() else {
            return false;
        };
        tx.send(response).is_ok()
    }
}

#[derive(Default)]
struct Table {
    /// namespace -> (id -> inflight)
    rows: HashMap<String, HashMap<String, Arc<Inflight>>>,
    /// Namespaces ever attached to the event bus (I5). Deliberately separate
    /// from `rows`, whose namespace entries are removed once empty — an
    /// attach must never happen twice even if every inflight in a namespace
    /// has come and gone.
    attached: std::collections::HashSet<String>,
}

/// The process-wide inflight table.
pub struct InflightRegistry {
    table: AsyncMutex<Table>,
    event_bus: ArcSwapOption<dyn EventBus>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self {
            table: AsyncMutex::new(Table::default()),
            event_bus: ArcSwapOption::empty(),
        }
    }

    /// Second half of the bridge's two-phase init (§9): wires in the event
    /// bus after construction, breaking the bridge/event-bus cyclic
    /// dependency. Idempotent in the sense that a later call simply replaces
    /// the stored bus, but the bridge only ever calls this once.
    pub fn attach_bus(&self, bus: Arc<dyn EventBus>) {
        self.event_bus.store(Some(bus));
    }

    /// Registers a new inflight, attaching the namespace's event bus listener
    /// first if this is the namespace's first-ever inflight. `dispatch` is
    /// the callback to attach; it is only invoked (by the event bus, via
    /// `add_namespace_listener`) for a namespace whose attach this call
    /// performs — callers may pass the same [`NamespaceListener`] for every
    /// namespace.
    pub async fn add(
        &self,
        namespace: &str,
        id: &str,
        kind: RequestKind,
        dispatch: NamespaceListener,
    ) -> Result<oneshot::Receiver<InflightResponse>, BridgeError> {
        let mut table = self.table.lock().await;

        if !table.attached.contains(namespace) {
            let bus = self.event_bus.load_full().ok_or_else(|| {
                BridgeError::Internal("event bus not attached; call Bridge::attach first".into())
            })?;
            bus.add_namespace_listener(namespace, dispatch)
                .await
                .map_err(|e| BridgeError::ListenerAttach(anyhow::anyhow!(e)))?;
            table.attached.insert(namespace.to_string());
            tracing::debug!(namespace, "attached event bus listener");
        }

        let row = table.rows.entry(namespace.to_string()).or_default();
        if row.contains_key(id) {
            return Err(BridgeError::DuplicateInflight {
                namespace: namespace.to_string(),
                id: id.to_string(),
            });
        }

        let (tx, rx) = oneshot::channel();
        let inflight = Arc::new(Inflight {
            id: id.to_string(),
            kind,
            namespace: namespace.to_string(),
            start: Instant::now(),
            responder: SyncMutex::new(Some(tx)),
        });
        row.insert(id.to_string(), inflight);
        tracing::debug!(namespace, id, ?kind, "registered inflight");
        Ok(rx)
    }

    /// Looks up an inflight by namespace and id, requiring its stored kind to
    /// match `kind` (invariant P5). Cross-kind lookups never alias, which is
    /// what lets the matcher probe more than one kind for a single event id.
    pub async fn get(&self, namespace: &str, kind: RequestKind, id: &str) -> Option<Arc<Inflight>> {
        let table = self.table.lock().await;
        let inflight = table.rows.get(namespace)?.get(id)?;
        (inflight.kind == kind).then(|| inflight.clone())
    }

    /// `true` if `namespace` currently has zero inflights. Used by the
    /// matcher's fast path (P3) to skip database reads entirely.
    pub async fn is_namespace_empty(&self, namespace: &str) -> bool {
        let table = self.table.lock().await;
        table.rows.get(namespace).is_none_or(HashMap::is_empty)
    }

    /// Removes an inflight. Idempotent — removing an absent id is not an
    /// error. Drops the namespace row once it becomes empty (memory only;
    /// `attached` is untouched, see I5).
    pub async fn remove(&self, namespace: &str, id: &str) {
        let mut table = self.table.lock().await;
        if let Some(row) = table.rows.get_mut(namespace) {
            row.remove(id);
            if row.is_empty() {
                table.rows.remove(namespace);
            }
        }
        tracing::debug!(namespace, id, "removed inflight");
    }
}

impl Default for InflightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
