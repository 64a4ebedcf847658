//! Cancellation token handed to the worker callback.
//!
//! A termination signal never interrupts the worker directly. The signal
//! router marks the token as requested, and the worker observes it through
//! [`Shutdown::is_requested`] or one of the blocking waits. Workers that
//! ignore the token are still terminated once the grace period runs out.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct State {
    signal: Option<i32>,
    worker_done: bool,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    changed: Condvar,
}

/// Shared shutdown notification.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    /// Builds a token with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a termination signal has been received.
    pub fn is_requested(&self) -> bool {
        self.lock().signal.is_some()
    }

    /// Raw number of the termination signal, if one was received.
    pub fn signal(&self) -> Option<i32> {
        self.lock().signal
    }

    /// Blocks until shutdown is requested.
    pub fn wait(&self) {
        let guard = self.lock();
        drop(
            self.inner
                .changed
                .wait_while(guard, |state| state.signal.is_none())
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    /// Blocks until shutdown is requested or `timeout` elapses.
    ///
    /// Returns `true` when shutdown was requested. Workers use this as an
    /// interruptible sleep.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .inner
            .changed
            .wait_timeout_while(guard, timeout, |state| state.signal.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.signal.is_some()
    }

    /// Records a termination request. Only the first request wins; later ones
    /// return `false` and leave the recorded signal untouched.
    pub(crate) fn request(&self, signal: i32) -> bool {
        let mut state = self.lock();
        if state.signal.is_some() {
            return false;
        }
        state.signal = Some(signal);
        self.inner.changed.notify_all();
        true
    }

    /// Records that the worker callback has returned.
    pub(crate) fn finish_worker(&self) {
        let mut state = self.lock();
        state.worker_done = true;
        self.inner.changed.notify_all();
    }

    /// Waits up to `grace` for the worker callback to return.
    pub(crate) fn wait_for_worker(&self, grace: Duration) -> bool {
        let guard = self.lock();
        let (state, _) = self
            .inner
            .changed
            .wait_timeout_while(guard, grace, |state| !state.worker_done)
            .unwrap_or_else(PoisonError::into_inner);
        state.worker_done
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
