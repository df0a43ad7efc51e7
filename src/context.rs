//! The caller-supplied waiting policy: how long to wait, and whether the
//! caller can cancel early.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Governs how long [`crate::bridge::Bridge`]'s `wait_for_*` methods block.
/// Constructed with [`WaitContext::new`] (a bare deadline) or
/// [`WaitContext::cancellable`] (a deadline plus a token the caller can fire
/// to abandon the wait early, e.g. on client disconnect).
#[derive(Clone)]
pub struct WaitContext {
    timeout: Duration,
    cancellation: Option<CancellationToken>,
}

impl WaitContext {
    /// Waits up to `timeout` with no early-cancellation path.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancellation: None,
        }
    }

    /// Waits up to `timeout`, or until `token` is cancelled, whichever comes
    /// first.
    pub fn cancellable(timeout: Duration, token: CancellationToken) -> Self {
        Self {
            timeout,
            cancellation: Some(token),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves when this context's cancellation token fires, or never
    /// resolves if none was supplied. Meant to be raced against a deadline
    /// and the inflight's response channel in `tokio::select!`.
    pub async fn cancelled(&self) {
        match &self.cancellation {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
