//! Cancellable delayed tasks.
//!
//! [`Scheduler::schedule`] runs a closure after a delay on the Tokio runtime
//! and returns a [`TaskHandle`]; [`Scheduler::cancel`] prevents it from
//! running if it has not fired yet. Firing and cancelling race under one
//! lock, so exactly one of them wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::trace;

use crate::lock;

/// Identifies a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Registry of pending delayed tasks.
///
/// Cloning is cheap and clones share the registry.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, AbortHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `delay` has elapsed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.inner);

        // Held across the spawn so the task cannot fire before it is registered.
        let mut pending = lock(&self.inner.pending);
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let due = lock(&registry.pending).remove(&id).is_some();
            if due {
                trace!(task = id, "scheduled task firing");
                task();
            }
        });
        pending.insert(id, join.abort_handle());

        TaskHandle(id)
    }

    /// Cancel a scheduled task.
    ///
    /// Returns `true` if the task was still pending and will now never run.
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        match lock(&self.inner.pending).remove(&handle.0) {
            Some(abort) => {
                abort.abort();
                trace!(task = handle.0, "scheduled task cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of tasks that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        lock(&self.inner.pending).len()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
