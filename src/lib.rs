#![cfg_attr(docsrs, feature(doc_cfg))]

//! A sync/async correlation bridge for a multi-party blockchain orchestration
//! node.
//!
//! Orchestration nodes issue requests (send a message, create a token pool,
//! submit a transfer) whose outcome only becomes known later, as an event on
//! the node's event bus. Callers on the synchronous side of the node — an
//! HTTP handler blocked on a request/reply call, say — need a way to await
//! that later event without knowing anything about how the event bus works.
//! This crate is that bridge: register an inflight request, have the bridge
//! correlate the right event to it when one arrives, and get back a typed
//! result or a typed error.
//!
//! # Key concepts
//! - [bridge::Bridge] is the entry point: construct with a [db::Database],
//!   [bridge::Bridge::attach] an [event::EventBus], then call one of its
//!   `wait_for_*` methods per request kind.
//! - [registry::InflightRegistry] is the process-wide table of requests
//!   currently being waited on, partitioned by namespace.
//! - [matcher] decides which inflight(s) an incoming [event::Event] resolves;
//!   [resolver] turns that decision into a delivered [model::InflightPayload]
//!   or [error::BridgeError].
//! - [context::WaitContext] carries a caller's deadline and optional
//!   cancellation token.
//!
//! # Quickstart
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use syncbridge::bridge::Bridge;
//! use syncbridge::context::WaitContext;
//! # use syncbridge::db::Database;
//! # use syncbridge::event::EventBus;
//! # async fn example(db: Arc<dyn Database>, bus: Arc<dyn EventBus>) -> Result<(), syncbridge::error::BridgeError> {
//! let bridge = Bridge::new(db);
//! bridge.attach(bus);
//!
//! let ctx = WaitContext::new(Duration::from_secs(30));
//! let message = bridge
//!     .wait_for_message("ns1", "msg-1", ctx, || async { Ok(()) })
//!     .await?;
//! # let _ = message;
//! # Ok(())
//! # }
//! ```

/// The public [bridge::Bridge] type and its construction/configuration surface.
pub mod bridge;

/// How long a `wait_for_*` call blocks, and how a caller can cancel it early.
pub mod context;

/// The read-only database contract the bridge consumes.
pub mod db;

/// The closed error taxonomy every bridge operation can fail with.
pub mod error;

/// The event-bus contract the bridge consumes, and the events it carries.
pub mod event;

/// Rules for matching an incoming event against the inflights waiting on it.
pub mod matcher;

/// Domain entities the bridge hydrates from the database and returns to callers.
pub mod model;

/// The process-wide table of requests currently being waited on.
pub mod registry;

/// Turns a matched event into a delivered payload or error.
pub mod resolver;

pub use bridge::{Bridge, BridgeBuilder, BridgeConfig};
pub use context::WaitContext;
pub use error::BridgeError;
