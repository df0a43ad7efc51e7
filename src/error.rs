//! The bridge's closed error taxonomy.
//!
//! Every synchronously-returned error and every typed rejection delivered through
//! an inflight's response slot is a variant of [`BridgeError`]. Errors that
//! originate outside the bridge (a caller's `send` callback, the event bus's
//! listener-attach call) are kept as [`std::error::Error`] sources rather than
//! flattened into strings.

use thiserror::Error;

/// All errors the bridge can surface to a caller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The caller's cancellation signal fired, or the deadline elapsed, before
    /// a resolution arrived.
    #[error("request {id} timed out after {elapsed_ms}ms")]
    RequestTimeout { id: String, elapsed_ms: u64 },

    /// A `MessageRejected` event matched this inflight.
    #[error("message {id} rejected")]
    MessageRejected { id: String },

    /// A `PoolRejected` event matched this inflight.
    #[error("token pool {id} rejected")]
    TokenPoolRejected { id: String },

    /// A `TransferOpFailed` event matched this inflight.
    #[error("token transfer {id} failed")]
    TokenTransferFailed { id: String },

    /// `add` was called twice with the same `(namespace, id)` pair. This is a
    /// programmer error — callers are responsible for choosing ids that are
    /// unique within a namespace (invariant I1).
    #[error("duplicate inflight request {id} in namespace {namespace}")]
    DuplicateInflight { namespace: String, id: String },

    /// The caller-supplied `send` callback failed. The inflight is cleaned up
    /// before this is returned.
    #[error("send failed")]
    Send(#[source] anyhow::Error),

    /// `EventBus::add_namespace_listener` failed on first use of a namespace.
    #[error("failed to attach event bus listener")]
    ListenerAttach(#[source] anyhow::Error),

    /// An invariant the bridge relies on did not hold. Seeing this means a bug
    /// in the bridge itself, not in a caller or a collaborator.
    #[error("internal bridge error: {0}")]
    Internal(String),
}
