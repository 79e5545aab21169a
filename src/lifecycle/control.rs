//! Shared control block between a lifecycle and the threads observing it.

use super::state::{State, StopPolicy};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// State, cancellation flags and progress of one lifecycle.
///
/// Islands of a distributed run are linked to their parent's block, so a
/// stop or abort requested on the parent is observed by every island.
#[derive(Debug, Default)]
pub struct Control {
    state: Mutex<State>,
    changed: Condvar,
    stop: AtomicBool,
    abort: AtomicBool,
    policy: Mutex<StopPolicy>,
    iteration: AtomicUsize,
    launches: AtomicUsize,
    parent: OnceLock<Arc<Control>>,
}

impl Control {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> State {
        *self.lock_state()
    }

    pub(crate) fn set_state(&self, state: State) {
        *self.lock_state() = state;
        self.changed.notify_all();
    }

    /// Atomically enters `Executing`, clearing stale stop requests.
    ///
    /// Returns the current state if the lifecycle is already executing.
    pub(crate) fn begin(&self) -> std::result::Result<(), State> {
        let mut state = self.lock_state();
        if state.is_executing() {
            return Err(*state);
        }
        self.stop.store(false, Ordering::SeqCst);
        self.abort.store(false, Ordering::SeqCst);
        *state = State::Executing;
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.changed.notify_all();
        Ok(())
    }

    /// Number of times the lifecycle has entered `Executing`.
    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Blocks until a launch after the `seen`-th has begun, or `gave_up`
    /// returns `true`.
    pub(crate) fn wait_for_launch(&self, seen: usize, gave_up: impl Fn() -> bool) {
        let mut state = self.lock_state();
        while self.launches() == seen && !gave_up() {
            state = self
                .changed
                .wait_timeout(state, Duration::from_millis(1))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
            || self.parent.get().is_some_and(|p| p.stop_requested())
    }

    /// Returns `true` once a forced stop was requested here or on a parent.
    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
            || self.parent.get().is_some_and(|p| p.abort_requested())
    }

    pub(crate) fn requested_policy(&self) -> StopPolicy {
        if self.stop.load(Ordering::SeqCst) {
            *self.policy.lock().unwrap_or_else(PoisonError::into_inner)
        } else {
            self.parent
                .get()
                .map(|p| p.requested_policy())
                .unwrap_or_default()
        }
    }

    pub(crate) fn publish_iteration(&self, iteration: usize) {
        self.iteration.store(iteration, Ordering::Relaxed);
    }

    pub(crate) fn iteration(&self) -> usize {
        self.iteration.load(Ordering::Relaxed)
    }

    /// Links this block to a parent; only the first link is kept.
    pub(crate) fn link_parent(&self, parent: Arc<Control>) {
        if self.parent.set(parent).is_err() {
            debug!("control block already linked to a parent");
        }
    }

    fn request(&self, policy: StopPolicy) {
        *self.policy.lock().unwrap_or_else(PoisonError::into_inner) = policy;
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Cloneable, thread-safe handle for observing and stopping a lifecycle.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    control: Arc<Control>,
}

impl StopHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn control(&self) -> &Arc<Control> {
        &self.control
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.control.state()
    }

    /// Last iteration published by the loop.
    pub fn iteration(&self) -> usize {
        self.control.iteration()
    }

    /// Requests a graceful stop without waiting.
    ///
    /// Returns `false` (and does nothing) if the lifecycle is not executing.
    pub fn request_stop(&self) -> bool {
        let state = self.control.lock_state();
        if !state.is_executing() {
            return false;
        }
        self.control.request(StopPolicy::Default);
        true
    }

    /// Stops the lifecycle and blocks until the loop has halted.
    ///
    /// With [`StopPolicy::Default`] the current iteration completes first.
    /// With [`StopPolicy::Timeout`] the graceful path gets the given
    /// budget, after which the run is aborted at the next processed index.
    /// Calling this on a lifecycle that is not executing is a no-op that
    /// returns its current state.
    ///
    /// Must not be called from inside the lifecycle's own evolution step.
    pub fn stop(&self, policy: StopPolicy) -> State {
        let control = &self.control;
        let state = control.lock_state();
        if !state.is_executing() {
            return *state;
        }
        control.request(policy);

        let state = match policy {
            StopPolicy::Default => control
                .changed
                .wait_while(state, |s| s.is_executing())
                .unwrap_or_else(PoisonError::into_inner),
            StopPolicy::Timeout(budget) => {
                let (state, timeout) = control
                    .changed
                    .wait_timeout_while(state, budget, |s| s.is_executing())
                    .unwrap_or_else(PoisonError::into_inner);
                if !timeout.timed_out() {
                    return *state;
                }
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "graceful stop timed out, aborting"
                );
                control.abort.store(true, Ordering::SeqCst);
                control
                    .changed
                    .wait_while(state, |s| s.is_executing())
                    .unwrap_or_else(PoisonError::into_inner)
            }
        };
        *state
    }

    /// Forces the run to abort at the next processed index, without waiting.
    pub fn abort(&self) {
        let state = self.control.lock_state();
        if state.is_executing() {
            self.control.request(StopPolicy::Timeout(Default::default()));
            self.control.abort.store(true, Ordering::SeqCst);
        }
    }
}
