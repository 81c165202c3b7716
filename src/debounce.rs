//! Cancellable debounce timer.
//!
//! Input changes schedule a callback to run after a quiet period; scheduling
//! again before the period elapses cancels the pending callback, so only the
//! most recent input set is ever applied. Cancellation is generation-based:
//! each schedule bumps a counter, and a timer only fires if its generation
//! is still current when the delay elapses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounced scheduler for one logical trigger.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `callback` to run after the quiet period.
    ///
    /// Any previously scheduled callback that has not fired yet is
    /// cancelled. The returned handle is only useful for tests that want to
    /// await timer completion.
    pub fn call<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let scheduled = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == scheduled {
                callback();
            }
        })
    }

    /// Cancel any pending callback without scheduling a new one.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
