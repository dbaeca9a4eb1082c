//! Supervised background-task registry.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::Result;

/// Registry for fire-and-forget background work.
///
/// A task resolving to `Err` is logged on the diagnostic channel and nothing
/// more: background failures are deliberately not termination triggers, so a
/// failed task can leave the process degraded but still running. A task that
/// panics instead goes through the process panic hook and does escalate.
#[derive(Debug)]
pub struct TaskRegistry {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when the registry closes.
    ///
    /// Long-lived tasks must select against it or they will hang the close.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a supervised task under `name`.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match task.await {
                Ok(()) => debug!(task = name, "background task finished"),
                Err(err) => warn!(task = name, %err, "background task failed"),
            }
        });
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Whether no tasks are running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Cancel the registry token and wait for every spawned task.
    ///
    /// No timeout is applied; a task that ignores the token hangs the caller.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
