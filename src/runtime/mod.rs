//! Dispatch layer driving reconcilers from store watch events.
//!
//! Events are mapped to object keys, deduplicated in a [`queue::WorkQueue`] and
//! handed to a fixed pool of workers. A key is never reconciled by two workers
//! at once. Failed runs are retried with per-key exponential backoff.

/// Per-key retry delays.
pub mod backoff;
/// Watch-driven controller loop.
pub mod controller;
/// Deduplicating work queue.
pub mod queue;

use std::time::Duration;

use futures::future::BoxFuture;

use crate::dao::models::ObjectKey;

pub use self::controller::Controller;

/// What the dispatch layer should do after a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Reconcile the same key again after `delay`, even without new events.
    pub fn requeue(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }

    /// Wait for the next watch event touching the key.
    pub fn await_change() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Delay after which the key is reconciled again, if any.
    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// Level-triggered reconciliation entry point invoked by the dispatch layer.
pub trait Reconciler: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Bring the object identified by `key` in line with its derived state.
    ///
    /// Any error schedules a retry with backoff.
    fn reconcile(&self, key: ObjectKey) -> BoxFuture<'_, Result<Action, Self::Error>>;

    /// Whether `error` only reports a lost optimistic-concurrency race.
    fn is_conflict(_error: &Self::Error) -> bool {
        false
    }
}
