//! Background execution of a lifecycle.

use super::control::StopHandle;
use super::state::{StartOption, State, StopPolicy};
use super::types::Lifecycle;
use crate::error::Result;
use std::panic;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// A lifecycle executing on its own thread.
///
/// The lifecycle is handed back by [`join`](Self::join) once its loop has
/// halted, so it can be inspected, resumed or restarted.
///
/// # Examples
///
/// ```
/// use u_evolve::prelude::*;
///
/// let config = PanmicticConfig::default().with_population_size(10);
/// let topology: Panmictic<u64, u64> = Panmictic::new(config, |_: &mut EvoRng| 0)?;
/// // runs until stopped
/// let ga = Ga::new(topology, GaConfig::default().with_seed(1), |ga| ga.evaluate(|v: &u64| *v))?;
///
/// let running = Running::start(ga)?;
/// assert_eq!(running.stop(StopPolicy::Default), State::Stopped(StopPolicy::Default));
/// let (ga, outcome) = running.join();
/// assert!(outcome.is_ok());
/// assert!(ga.iteration() >= 1);
/// # Ok::<(), u_evolve::EvoError>(())
/// ```
#[derive(Debug)]
pub struct Running<L: Lifecycle + 'static> {
    handle: StopHandle,
    thread: JoinHandle<(L, Result<State>)>,
}

impl<L: Lifecycle + 'static> Running<L> {
    /// Starts `lifecycle` in the background.
    pub fn start(lifecycle: L) -> Result<Self> {
        Self::launch(lifecycle, StartOption::Start)
    }

    /// Launches `lifecycle` in the background with `option`.
    ///
    /// Returns once the loop has entered `Executing`, or once the launch
    /// has failed (the failure is then reported by [`join`](Self::join)).
    pub fn launch(mut lifecycle: L, option: StartOption) -> Result<Self> {
        let handle = lifecycle.stop_handle();
        let seen = handle.control().launches();
        let thread = thread::Builder::new()
            .name("u-evolve".into())
            .spawn(move || {
                let outcome = lifecycle.launch(option);
                (lifecycle, outcome)
            })?;
        handle
            .control()
            .wait_for_launch(seen, || thread.is_finished());
        info!(?option, "lifecycle running in background");
        Ok(Self { handle, thread })
    }

    /// Handle for observing and stopping the run.
    pub fn stop_handle(&self) -> &StopHandle {
        &self.handle
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Last iteration published by the loop.
    pub fn iteration(&self) -> usize {
        self.handle.iteration()
    }

    /// Returns `true` once the background thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stops the run and blocks until the loop has halted.
    ///
    /// See [`StopHandle::stop`].
    pub fn stop(&self, policy: StopPolicy) -> State {
        self.handle.stop(policy)
    }

    /// Waits for the thread and returns the lifecycle with the outcome of
    /// its launch.
    ///
    /// A panic inside the lifecycle is resumed on the calling thread.
    pub fn join(self) -> (L, Result<State>) {
        match self.thread.join() {
            Ok(joined) => joined,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Interrupts the run and restarts it in the background.
    ///
    /// With `force_stop` the current iteration is aborted at the next
    /// processed index; otherwise it completes first. The outcome of the
    /// interrupted launch is logged and discarded.
    pub fn restart(self, force_stop: bool, reset_population: bool) -> Result<Self> {
        if force_stop {
            self.handle.stop(StopPolicy::Timeout(Duration::ZERO));
        } else {
            self.handle.stop(StopPolicy::Default);
        }
        let (lifecycle, outcome) = self.join();
        if let Err(err) = outcome {
            warn!(%err, "interrupted run had failed");
        }
        Self::launch(
            lifecycle,
            StartOption::Restart {
                force_stop,
                reset_population,
            },
        )
    }
}
