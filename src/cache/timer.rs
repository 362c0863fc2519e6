//! Expiry Timer Module
//!
//! One spawned task per entry that sleeps for the entry's TTL and then runs an
//! expiry callback under the engine's write lock.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::AbortHandle;

// == Expiry Timer ==
/// A cancelable delayed callback.
///
/// Dropping the timer aborts the pending task, so removing a timer from an
/// index also stops it.
#[derive(Debug)]
pub(crate) struct ExpiryTimer {
    handle: AbortHandle,
}

impl ExpiryTimer {
    // == Schedule ==
    /// Spawns a task that waits `ttl`, takes the write lock on `state` and runs
    /// `on_fire` against it.
    ///
    /// The task only holds a weak reference, so pending timers never keep a
    /// dropped engine alive.
    pub(crate) fn schedule<S, F>(state: &Arc<RwLock<S>>, ttl: Duration, on_fire: F) -> Self
    where
        S: Send + Sync + 'static,
        F: FnOnce(&mut S) + Send + 'static,
    {
        let state: Weak<RwLock<S>> = Arc::downgrade(state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;

            if let Some(state) = state.upgrade() {
                let mut guard = state.write().await;
                on_fire(&mut guard);
            }
        })
        .abort_handle();

        Self { handle }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
