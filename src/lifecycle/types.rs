//! Core trait definitions for lifecycles.
//!
//! [`Lifecycle`] is the run-control contract implemented by every topology
//! engine; [`Island`] adds the chromosome access a distributed run needs to
//! migrate between its islands.

use super::control::StopHandle;
use super::state::{StartOption, State, StopPolicy};
use crate::error::Result;
use crate::population::Chromosome;

/// Run control of one evolutionary engine.
///
/// `start`, `resume` and `restart` run the iteration loop on the calling
/// thread and return the state the loop halted in. Use
/// [`Running`](super::Running) to run a lifecycle in the background, and
/// a [`StopHandle`] to stop it from another thread.
pub trait Lifecycle: Send {
    /// Current state.
    fn state(&self) -> State;

    /// Number of iterations since the last (re)start.
    fn iteration(&self) -> usize;

    /// Starts the loop, initializing the population if needed.
    ///
    /// On a stopped or finished lifecycle this continues the run.
    fn start(&mut self) -> Result<State>;

    /// Continues a stopped or finished run with its iteration counter and
    /// population unchanged.
    fn resume(&mut self) -> Result<State>;

    /// Resets the iteration counter and runs again, re-randomizing the
    /// population if `reset_population` is set.
    ///
    /// `force_stop` only matters for a lifecycle executing in the
    /// background (see [`Running::restart`](super::Running::restart)).
    fn restart(&mut self, force_stop: bool, reset_population: bool) -> Result<State>;

    /// Dispatches to `start`, `resume` or `restart`.
    fn launch(&mut self, option: StartOption) -> Result<State> {
        match option {
            StartOption::Start => self.start(),
            StartOption::Resume => self.resume(),
            StartOption::Restart {
                force_stop,
                reset_population,
            } => self.restart(force_stop, reset_population),
        }
    }

    /// Handle for observing and stopping this lifecycle from other threads.
    fn stop_handle(&self) -> StopHandle;

    /// Stops the lifecycle; a no-op if it is not executing.
    fn stop(&self, policy: StopPolicy) -> State {
        self.stop_handle().stop(policy)
    }

    /// Makes this lifecycle observe stop requests issued on `parent`.
    fn attach_parent(&mut self, parent: &StopHandle);
}

/// A lifecycle whose chromosomes can be read and replaced by index.
///
/// Every `Ga` implements it, so islands of a distributed run may be
/// panmictic, cellular or distributed themselves.
pub trait Island<V, F>: Lifecycle {
    /// Number of chromosomes reachable through this island.
    fn island_size(&self) -> usize;

    /// Chromosome at `index`.
    ///
    /// # Panics
    /// Panics if `index >= island_size()`.
    fn chromosome(&self, index: usize) -> &Chromosome<V, F>;

    /// Replaces the chromosome at `index`.
    ///
    /// # Panics
    /// Panics if `index >= island_size()`.
    fn replace_chromosome(&mut self, index: usize, chromosome: Chromosome<V, F>);
}
