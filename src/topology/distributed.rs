//! Island model: a ring of independent lifecycles.
//!
//! A [`Distributed`] topology owns a list of islands, each a complete
//! lifecycle (usually a [`Ga`] over a panmictic or cellular population, or a
//! nested distributed run). One iteration of the distributed run typically
//! launches every island for a bounded number of its own iterations, then
//! migrates chromosomes around the ring:
//!
//! ```
//! use u_evolve::prelude::*;
//! use rand::Rng;
//!
//! let island = |seed: u64| -> u_evolve::Result<Box<dyn Island<f64, f64>>> {
//!     let config = PanmicticConfig::default().with_population_size(20).with_elitism(1);
//!     let topology: Panmictic<f64, f64> =
//!         Panmictic::new(config, |rng: &mut EvoRng| rng.random_range(-5.0..5.0))?;
//!     let ga = Ga::new(topology, GaConfig::default().with_seed(seed), |ga| {
//!         ga.evaluate(|x: &f64| x * x)?;
//!         ga.sort();
//!         ga.select(Selection::Tournament(2))?;
//!         ga.mutate(0.5, |x: &mut f64, rng: &mut EvoRng| {
//!             *x += rng.random_range(-0.1..0.1);
//!             Ok(())
//!         })?;
//!         ga.evaluate(|x: &f64| x * x)?;
//!         ga.stop_by_session_iteration(5);
//!         Ok(())
//!     })?;
//!     Ok(Box::new(ga))
//! };
//!
//! let islands = (0..3).map(island).collect::<u_evolve::Result<Vec<_>>>()?;
//! let topology = Distributed::new(DistributedConfig::default(), islands)?;
//! let mut ga = Ga::new(topology, GaConfig::default().with_seed(9), |ga| {
//!     ga.launch_islands()?;
//!     ga.migrate(0.1)?;
//!     ga.stop_by_max_iteration(4);
//!     Ok(())
//! })?;
//!
//! assert_eq!(ga.start()?, State::Finished(FinishReason::MaxIteration));
//! assert!(ga.topology().islands().iter().all(|island| island.iteration() == 20));
//! # Ok::<(), u_evolve::EvoError>(())
//! ```
//!
//! Islands keep their own iteration counters across rounds, so bound each
//! round with [`Ga::stop_by_session_iteration`] rather than an absolute
//! budget.

use super::migration::migrate;
use super::Topology;
use crate::error::{EvoError, Result};
use crate::lifecycle::{FinishReason, Ga, Island, StartOption, State, StopHandle};
use crate::population::{Chromosome, Fitness, Goal};
use crate::random::EvoRng;
use std::fmt;
use tracing::debug;

/// Configuration of a distributed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributedConfig {
    /// How islands are launched in the first round.
    pub start_option: StartOption,

    /// Finishes the whole run once any island finishes by its own stop
    /// condition.
    pub finish_on_island_stop_condition: bool,

    /// Optimization direction, used to pick the best chromosome across
    /// islands.
    pub goal: Goal,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            start_option: StartOption::Start,
            finish_on_island_stop_condition: true,
            goal: Goal::Minimize,
        }
    }
}

impl DistributedConfig {
    /// Sets the first-round start option.
    pub fn with_start_option(mut self, option: StartOption) -> Self {
        self.start_option = option;
        self
    }

    /// Sets whether an island's stop condition ends the run.
    pub fn with_finish_on_island_stop_condition(mut self, finish: bool) -> Self {
        self.finish_on_island_stop_condition = finish;
        self
    }

    /// Sets the optimization direction.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }
}

/// Ring of islands.
pub struct Distributed<V, F> {
    config: DistributedConfig,
    start_option: StartOption,
    launched: bool,
    islands: Vec<Box<dyn Island<V, F>>>,
}

impl<V, F> Distributed<V, F> {
    /// Creates a topology over `islands`; at least one island is required.
    pub fn new(config: DistributedConfig, islands: Vec<Box<dyn Island<V, F>>>) -> Result<Self> {
        if islands.is_empty() {
            return Err(EvoError::config("distributed topology needs at least one island"));
        }
        Ok(Self {
            config,
            start_option: config.start_option,
            launched: false,
            islands,
        })
    }

    /// Creates a topology from islands of one concrete type.
    pub fn from_islands<I>(config: DistributedConfig, islands: impl IntoIterator<Item = I>) -> Result<Self>
    where
        I: Island<V, F> + 'static,
    {
        let islands = islands
            .into_iter()
            .map(|island| Box::new(island) as Box<dyn Island<V, F>>)
            .collect();
        Self::new(config, islands)
    }

    /// The configuration.
    pub fn config(&self) -> &DistributedConfig {
        &self.config
    }

    /// Option the next round launches islands with.
    pub fn start_option(&self) -> StartOption {
        self.start_option
    }

    /// The islands, in ring order.
    pub fn islands(&self) -> &[Box<dyn Island<V, F>>] {
        &self.islands
    }

    /// Mutable access to the islands.
    pub fn islands_mut(&mut self) -> &mut [Box<dyn Island<V, F>>] {
        &mut self.islands
    }

    /// Island and local index of a flattened chromosome index, `None` past
    /// the last island.
    fn locate(&self, mut index: usize) -> Option<(usize, usize)> {
        for (k, island) in self.islands.iter().enumerate() {
            let size = island.island_size();
            if index < size {
                return Some((k, index));
            }
            index -= size;
        }
        None
    }

    /// Chromosome at a flattened index across all islands.
    pub fn get(&self, index: usize) -> Option<&Chromosome<V, F>> {
        self.locate(index)
            .map(|(k, local)| self.islands[k].chromosome(local))
    }
}

impl<V, F> Topology for Distributed<V, F>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    type Value = V;
    type Fit = F;

    fn initialize(&mut self, _rng: &mut EvoRng) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self, _rng: &mut EvoRng) -> Result<()> {
        // islands re-randomize themselves when restarted with the option
        Ok(())
    }

    fn prepare(&mut self, option: StartOption) {
        self.start_option = match option {
            StartOption::Start if !self.launched => self.config.start_option,
            option => option,
        };
        self.launched = true;
    }

    fn attach(&mut self, owner: &StopHandle) {
        for island in &mut self.islands {
            island.attach_parent(owner);
        }
    }

    fn goal(&self) -> Goal {
        self.config.goal
    }

    fn size(&self) -> usize {
        self.islands.iter().map(|island| island.island_size()).sum()
    }

    fn chromosome(&self, index: usize) -> &Chromosome<V, F> {
        // out of range indexes one past the last island
        let (k, local) = self.locate(index).unwrap_or((self.islands.len(), index));
        self.islands[k].chromosome(local)
    }

    fn replace_chromosome(&mut self, index: usize, chromosome: Chromosome<V, F>) {
        let (k, local) = self.locate(index).unwrap_or((self.islands.len(), index));
        self.islands[k].replace_chromosome(local, chromosome);
    }
}

impl<V, F> fmt::Debug for Distributed<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states: Vec<State> = self.islands.iter().map(|island| island.state()).collect();
        f.debug_struct("Distributed")
            .field("config", &self.config)
            .field("start_option", &self.start_option)
            .field("islands", &states)
            .finish()
    }
}

impl<V, F> Ga<Distributed<V, F>>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    /// Runs every island once and waits for all of them.
    ///
    /// The first round uses the configured start option (or the option the
    /// distributed run itself was launched with); later rounds `start`
    /// the islands again, which continues them. An island failure is
    /// reported as [`EvoError::Island`].
    pub fn launch_islands(&mut self) -> Result<()> {
        let (topology, rng, processor) = self.parts();
        let option = topology.start_option;
        let count = topology.islands.len();

        processor.process(rng, &mut topology.islands, 0..count, |index, island, _| {
            let option = match option {
                StartOption::Resume if island.state() == State::Created => StartOption::Start,
                option => option,
            };
            match island.launch(option) {
                Ok(state) => {
                    debug!(index, %state, iteration = island.iteration(), "island halted");
                    Ok(())
                }
                Err(err) => Err(EvoError::Island {
                    index,
                    source: Box::new(err),
                }),
            }
        })?;
        topology.start_option = StartOption::Start;

        let converged = topology
            .islands
            .iter()
            .any(|island| island.state() == State::Finished(FinishReason::StopCondition));
        if converged && topology.config.finish_on_island_stop_condition {
            self.finish(FinishReason::StopCondition);
        }
        Ok(())
    }

    /// Moves `percent` of the smallest island's size around the ring.
    ///
    /// See [`migrate`] for the exact scheme. Returns the number of
    /// chromosomes each island sent.
    pub fn migrate(&mut self, percent: f64) -> Result<usize> {
        let (topology, rng, _) = self.parts();
        migrate(&mut topology.islands, percent, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{GaConfig, Lifecycle};
    use crate::topology::{Panmictic, PanmicticConfig};

    fn island<S>(values: Vec<u32>, step: S) -> Box<dyn Island<u32, u32>>
    where
        S: Fn(&mut Ga<Panmictic<u32, u32>>) -> Result<()> + Send + Sync + 'static,
    {
        let config = PanmicticConfig::default()
            .with_population_size(values.len())
            .with_goal(Goal::Maximize);
        let topology = Panmictic::with_values(config, values).unwrap();
        Box::new(Ga::new(topology, GaConfig::default().with_seed(1), step).unwrap())
    }

    fn counting(values: Vec<u32>) -> Box<dyn Island<u32, u32>> {
        island(values, |ga| {
            ga.evaluate(|v| *v)?;
            ga.stop_by_session_iteration(3);
            Ok(())
        })
    }

    fn distributed(
        islands: Vec<Box<dyn Island<u32, u32>>>,
        config: DistributedConfig,
        rounds: usize,
    ) -> Ga<Distributed<u32, u32>> {
        let topology = Distributed::new(config.with_goal(Goal::Maximize), islands).unwrap();
        Ga::new(topology, GaConfig::default().with_seed(4), move |ga| {
            ga.launch_islands()?;
            ga.stop_by_max_iteration(rounds);
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn test_requires_islands() {
        assert!(Distributed::<u32, u32>::new(DistributedConfig::default(), Vec::new()).is_err());
    }

    #[test]
    fn test_flattened_indexing() {
        let mut topology = Distributed::new(
            DistributedConfig::default(),
            vec![counting(vec![1, 2]), counting(vec![3, 4, 5])],
        )
        .unwrap();
        assert_eq!(topology.size(), 5);
        assert_eq!(topology.chromosome(2).value, 3);
        topology.replace_chromosome(4, Chromosome::new(50));
        assert_eq!(topology.islands()[1].chromosome(2).value, 50);
    }

    #[test]
    fn test_get_past_last_island_is_none() {
        let topology = Distributed::new(
            DistributedConfig::default(),
            vec![counting(vec![1, 2]), counting(vec![3, 4, 5])],
        )
        .unwrap();
        assert_eq!(topology.locate(1), Some((0, 1)));
        assert_eq!(topology.locate(2), Some((1, 0)));
        assert_eq!(topology.locate(5), None);
        assert_eq!(topology.get(4).map(|c| c.value), Some(5));
        assert!(topology.get(5).is_none());
    }

    #[test]
    #[should_panic]
    fn test_chromosome_out_of_range_panics() {
        let topology = Distributed::new(
            DistributedConfig::default(),
            vec![counting(vec![1, 2])],
        )
        .unwrap();
        topology.chromosome(2);
    }

    #[test]
    fn test_rounds_continue_islands() {
        let islands = vec![counting(vec![1; 4]), counting(vec![2; 4])];
        let mut ga = distributed(islands, DistributedConfig::default(), 3);
        assert_eq!(ga.start().unwrap(), State::Finished(FinishReason::MaxIteration));
        for island in ga.topology().islands() {
            assert_eq!(island.iteration(), 9);
            assert_eq!(island.state(), State::Finished(FinishReason::MaxIteration));
        }
        assert_eq!(ga.best_fitness(), Some(2));
    }

    #[test]
    fn test_island_stop_condition_finishes_run() {
        let converging = island(vec![7; 3], |ga| {
            ga.evaluate(|v| *v)?;
            ga.stop_by_target_fitness(7);
            Ok(())
        });
        let islands = vec![counting(vec![1; 3]), converging];
        let mut ga = distributed(islands, DistributedConfig::default(), 10);
        assert_eq!(ga.start().unwrap(), State::Finished(FinishReason::StopCondition));
        assert_eq!(ga.iteration(), 1);
    }

    #[test]
    fn test_island_stop_condition_ignored_when_disabled() {
        let converging = island(vec![7; 3], |ga| {
            ga.evaluate(|v| *v)?;
            ga.stop_by_target_fitness(7);
            Ok(())
        });
        let config = DistributedConfig::default().with_finish_on_island_stop_condition(false);
        let mut ga = distributed(vec![converging], config, 2);
        assert_eq!(ga.start().unwrap(), State::Finished(FinishReason::MaxIteration));
    }

    #[test]
    fn test_island_failure_reported() {
        let failing = island(vec![1; 2], |_| Err(EvoError::operator("island broke")));
        let islands = vec![counting(vec![1; 2]), failing];
        let mut ga = distributed(islands, DistributedConfig::default(), 3);
        match ga.start() {
            Err(EvoError::Island { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(*source, EvoError::Operator(_)));
            }
            other => panic!("expected island failure, got {other:?}"),
        }
        assert_eq!(ga.state(), State::Finished(FinishReason::Stopped));
    }

    #[test]
    fn test_restart_resets_islands() {
        let islands = vec![counting(vec![1; 2]), counting(vec![2; 2])];
        let mut ga = distributed(islands, DistributedConfig::default(), 2);
        ga.start().unwrap();
        assert_eq!(ga.topology().islands()[0].iteration(), 6);

        // the restart option reaches the islands in the first round
        assert_eq!(
            ga.restart(false, false).unwrap(),
            State::Finished(FinishReason::MaxIteration)
        );
        assert_eq!(ga.iteration(), 2);
        assert_eq!(ga.topology().islands()[0].iteration(), 6);
        assert_eq!(ga.topology().start_option(), StartOption::Start);
    }
}
