//! The evolution engine.
//!
//! [`Ga`] couples a [`Topology`] with a user-supplied evolution step and
//! drives it through the lifecycle state machine:
//!
//! ```text
//!            start                 step sets finish flag
//! Created ──────────► Executing ───────────────────────► Finished(reason)
//!                      │    ▲  ▲
//!          stop(policy)│    │  │ start / resume / restart
//!                      ▼    │  │
//!               Stopped(policy) ◄── abort ── Finished(Stopped)
//! ```
//!
//! Every iteration increments the counter, clears the finish flag and
//! calls the step once. The step applies operators (evaluate, select,
//! crossover, ...) and stop checks (`stop_by_*`); when one of them sets the
//! finish flag the loop ends in `Finished(reason)`.

use super::config::GaConfig;
use super::control::{Control, StopHandle};
use super::state::{FinishReason, StartOption, State};
use super::types::{Island, Lifecycle};
use crate::error::{EvoError, Result};
use crate::population::Chromosome;
use crate::processor::Processor;
use crate::random::{create_rng, seed_or_random, EvoRng};
use crate::store::Store;
use crate::topology::Topology;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Evolution step run once per iteration.
pub type EvolveFn<T> = Arc<dyn Fn(&mut Ga<T>) -> Result<()> + Send + Sync>;

/// Lifecycle-driven genetic algorithm over a topology.
///
/// # Examples
///
/// ```
/// use u_evolve::prelude::*;
/// use rand::Rng;
///
/// let config = PanmicticConfig::default()
///     .with_population_size(30)
///     .with_elitism(2)
///     .with_goal(Goal::Minimize);
/// let topology: Panmictic<f64, f64> =
///     Panmictic::new(config, |rng: &mut EvoRng| rng.random_range(-10.0..10.0))?;
///
/// let mut ga = Ga::new(topology, GaConfig::default().with_seed(1), |ga| {
///     ga.evaluate(|x: &f64| x * x)?;
///     ga.select(Selection::Tournament(2))?;
///     ga.mutate(0.3, |x: &mut f64, rng: &mut EvoRng| {
///         *x += rng.random_range(-0.5..0.5);
///         Ok(())
///     })?;
///     ga.evaluate(|x: &f64| x * x)?;
///     ga.stop_by_max_iteration(20);
///     Ok(())
/// })?;
///
/// assert_eq!(ga.start()?, State::Finished(FinishReason::MaxIteration));
/// assert_eq!(ga.iteration(), 20);
/// # Ok::<(), u_evolve::EvoError>(())
/// ```
pub struct Ga<T: Topology> {
    topology: T,
    rng: EvoRng,
    seed: u64,
    iteration: usize,
    session_iteration: usize,
    session_started: Instant,
    finish: Option<FinishReason>,
    store: Store,
    processor: Processor,
    handle: StopHandle,
    evolve: EvolveFn<T>,
}

impl<T: Topology> Ga<T> {
    /// Creates a lifecycle in the `Created` state.
    ///
    /// The population is not initialized until the first start.
    pub fn new<E>(mut topology: T, config: GaConfig, evolve: E) -> Result<Self>
    where
        E: Fn(&mut Ga<T>) -> Result<()> + Send + Sync + 'static,
    {
        config.validate()?;
        let handle = StopHandle::new();
        let processor = match config.parallelism {
            Some(parallelism) => Processor::parallel(parallelism)?,
            None => Processor::sequential(),
        }
        .with_control(Arc::clone(handle.control()));
        let seed = seed_or_random(config.seed);
        topology.attach(&handle);

        Ok(Self {
            topology,
            rng: create_rng(seed),
            seed,
            iteration: 0,
            session_iteration: 0,
            session_started: Instant::now(),
            finish: None,
            store: Store::default(),
            processor,
            handle,
            evolve: Arc::new(evolve),
        })
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Iterations since the last restart; survives stop and resume.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The topology.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Mutable access to the topology.
    pub fn topology_mut(&mut self) -> &mut T {
        &mut self.topology
    }

    /// Seed the random source was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The lifecycle's own random source.
    pub fn rng(&mut self) -> &mut EvoRng {
        &mut self.rng
    }

    /// Operator state that survives across iterations.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Mutable access to the operator state.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// The processor operators run on.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Iterations run since the current launch began.
    pub fn session_iteration(&self) -> usize {
        self.session_iteration
    }

    /// Time elapsed since the current launch began.
    pub fn session_elapsed(&self) -> Duration {
        self.session_started.elapsed()
    }

    /// Ends the loop after the current iteration.
    ///
    /// The first reason set during an iteration wins.
    pub fn finish(&mut self, reason: FinishReason) {
        if self.finish.is_none() {
            debug!(iteration = self.iteration, ?reason, "finish requested");
            self.finish = Some(reason);
        }
    }

    /// Finish reason set during the current iteration, if any.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish
    }

    /// Best evaluated chromosome; ties resolve to the lowest index.
    pub fn best(&self) -> Option<&Chromosome<T::Value, T::Fit>> {
        let goal = self.topology.goal();
        let mut best: Option<&Chromosome<T::Value, T::Fit>> = None;
        for index in 0..self.topology.size() {
            let candidate = self.topology.chromosome(index);
            if candidate.fitness.is_none() {
                continue;
            }
            if best.map_or(true, |b| goal.is_better(candidate.fitness, b.fitness)) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Fitness of [`best`](Self::best).
    pub fn best_fitness(&self) -> Option<T::Fit> {
        self.best().and_then(|c| c.fitness)
    }

    /// Splits the lifecycle into the parts operators work on.
    pub(crate) fn parts(&mut self) -> (&mut T, &mut EvoRng, &Processor) {
        (&mut self.topology, &mut self.rng, &self.processor)
    }

    fn launch_with(&mut self, option: StartOption) -> Result<State> {
        let operation = match option {
            StartOption::Start => "start",
            StartOption::Resume => "resume",
            StartOption::Restart { .. } => "restart",
        };
        let previous = self.handle.state();
        if option == StartOption::Resume && previous == State::Created {
            return Err(EvoError::InvalidTransition {
                operation,
                state: previous,
            });
        }
        self.handle
            .control()
            .begin()
            .map_err(|state| EvoError::InvalidTransition { operation, state })?;

        if let Err(err) = self.prepare(option) {
            warn!(%err, operation, "launch preparation failed");
            self.handle.control().set_state(previous);
            return Err(err);
        }
        self.execute()
    }

    fn prepare(&mut self, option: StartOption) -> Result<()> {
        self.topology.initialize(&mut self.rng)?;
        if let StartOption::Restart {
            reset_population, ..
        } = option
        {
            // counters and store survive a failed reset
            if reset_population {
                self.topology.reset(&mut self.rng)?;
            }
            self.iteration = 0;
            self.store.clear();
            self.handle.control().publish_iteration(0);
        }
        self.topology.prepare(option);
        Ok(())
    }

    fn execute(&mut self) -> Result<State> {
        self.session_iteration = 0;
        self.session_started = Instant::now();
        self.finish = None;
        info!(
            iteration = self.iteration,
            size = self.topology.size(),
            workers = self.processor.limit(),
            "evolution started"
        );

        let control = Arc::clone(self.handle.control());
        let state = match self.run(&control) {
            Ok(state) => state,
            Err(EvoError::Aborted) => State::Finished(FinishReason::Stopped),
            Err(err) => {
                warn!(iteration = self.iteration, %err, "evolution step failed");
                control.set_state(State::Finished(FinishReason::Stopped));
                return Err(err);
            }
        };
        control.set_state(state);
        info!(
            iteration = self.iteration,
            %state,
            best = ?self.best_fitness(),
            "evolution halted"
        );
        Ok(state)
    }

    fn run(&mut self, control: &Control) -> Result<State> {
        loop {
            if control.abort_requested() {
                return Ok(State::Finished(FinishReason::Stopped));
            }
            if control.stop_requested() {
                return Ok(State::Stopped(control.requested_policy()));
            }

            self.iteration += 1;
            self.session_iteration += 1;
            control.publish_iteration(self.iteration);
            self.finish = None;

            let evolve = Arc::clone(&self.evolve);
            evolve(self)?;
            debug!(iteration = self.iteration, "iteration complete");

            if let Some(reason) = self.finish.take() {
                return Ok(State::Finished(reason));
            }
        }
    }
}

impl<T: Topology> Lifecycle for Ga<T> {
    fn state(&self) -> State {
        self.handle.state()
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn start(&mut self) -> Result<State> {
        self.launch_with(StartOption::Start)
    }

    fn resume(&mut self) -> Result<State> {
        self.launch_with(StartOption::Resume)
    }

    fn restart(&mut self, force_stop: bool, reset_population: bool) -> Result<State> {
        self.launch_with(StartOption::Restart {
            force_stop,
            reset_population,
        })
    }

    fn stop_handle(&self) -> StopHandle {
        self.handle.clone()
    }

    fn attach_parent(&mut self, parent: &StopHandle) {
        self.handle.control().link_parent(Arc::clone(parent.control()));
    }
}

impl<T: Topology> Island<T::Value, T::Fit> for Ga<T> {
    fn island_size(&self) -> usize {
        self.topology.size()
    }

    fn chromosome(&self, index: usize) -> &Chromosome<T::Value, T::Fit> {
        self.topology.chromosome(index)
    }

    fn replace_chromosome(&mut self, index: usize, chromosome: Chromosome<T::Value, T::Fit>) {
        self.topology.replace_chromosome(index, chromosome);
    }
}

impl<T: Topology + fmt::Debug> fmt::Debug for Ga<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ga")
            .field("topology", &self.topology)
            .field("seed", &self.seed)
            .field("iteration", &self.iteration)
            .field("state", &self.handle.state())
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}
