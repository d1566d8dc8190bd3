//! Outstanding-work tracking for a dynamically growing fan-out
//!
//! The total number of tasks in a scan is unknown when it starts: every
//! finished task may discover more. [`WorkTracker`] keeps one pending count
//! for the whole tree. Each unit of work is represented by a [`WorkUnit`]
//! guard; dropping the guard retires the unit.
//!
//! The owner of a finished unit registers the units for its children while
//! it still holds its own guard, so the count can only reach zero once the
//! whole tree is done. Once zero it stays zero.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, oneshot};

#[derive(Debug)]
struct TrackerState {
    pending: AtomicUsize,
    idle: Notify,
}

impl TrackerState {
    fn retire(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Shared pending-work counter with completion notification
#[derive(Debug, Clone)]
pub struct WorkTracker {
    state: Arc<TrackerState>,
}

/// Guard for one outstanding unit of work
#[derive(Debug)]
#[must_use = "dropping a WorkUnit retires it immediately"]
pub struct WorkUnit {
    state: Arc<TrackerState>,
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        self.state.retire();
    }
}

impl WorkTracker {
    /// Create a tracker whose count starts at one, for the root task
    pub fn new() -> (Self, WorkUnit) {
        let state = Arc::new(TrackerState {
            pending: AtomicUsize::new(1),
            idle: Notify::new(),
        });
        let root = WorkUnit {
            state: state.clone(),
        };
        (Self { state }, root)
    }

    /// Register one more outstanding unit.
    ///
    /// Callers must hold a live [`WorkUnit`] of their own while registering,
    /// which keeps the count above zero.
    pub fn register(&self) -> WorkUnit {
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        WorkUnit {
            state: self.state.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Wait until no unit remains outstanding
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Spawn the watcher task that fires the returned receiver exactly once,
    /// when the count reaches zero
    pub fn spawn_watcher(&self) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let tracker = self.clone();
        tokio::spawn(async move {
            tracker.wait_idle().await;
            let _ = done_tx.send(());
        });
        done_rx
    }
}
