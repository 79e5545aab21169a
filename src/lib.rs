//! Domain-agnostic evolutionary computation engine.
//!
//! Evolves a population of chromosomes under one of three topologies:
//!
//! - **Panmictic**: a single population where every chromosome may mate
//!   with every other, with elitism and tournament/roulette/rank selection.
//! - **Cellular**: chromosomes placed on an N-dimensional toroidal grid,
//!   each one mating only within its Moore, Von Neumann or custom
//!   neighborhood, updated synchronously or asynchronously.
//! - **Distributed**: an island model whose islands are themselves
//!   lifecycles of any topology, exchanging chromosomes by ring migration.
//!
//! Every engine is a [`Ga`] driven through a controllable lifecycle
//! (`Created → Executing → Stopped/Finished`) that can be started, stopped,
//! resumed and restarted, on the calling thread or in the background with
//! [`Running`]. Operators execute on a [`Processor`] that splits index
//! ranges across rayon workers, each with its own seeded random source, so
//! a fixed seed and worker count reproduce a run exactly.
//!
//! # Example
//!
//! ```
//! use u_evolve::prelude::*;
//! use rand::Rng;
//!
//! let config = PanmicticConfig::default()
//!     .with_population_size(40)
//!     .with_elitism(2)
//!     .with_goal(Goal::Maximize);
//! let topology: Panmictic<Vec<bool>, usize> = Panmictic::new(config, |rng: &mut EvoRng| {
//!     (0..16).map(|_| rng.random_bool(0.5)).collect()
//! })?;
//!
//! let ones = |bits: &Vec<bool>| bits.iter().filter(|&&b| b).count();
//! let mut ga = Ga::new(topology, GaConfig::default().with_seed(7), move |ga| {
//!     ga.evaluate(ones)?;
//!     if ga.stop_by_target_fitness(16) || ga.stop_by_max_iteration(200) {
//!         return Ok(());
//!     }
//!     ga.select(Selection::Tournament(3))?;
//!     ga.mutate(0.5, |bits: &mut Vec<bool>, rng: &mut EvoRng| {
//!         let i = rng.random_range(0..bits.len());
//!         bits[i] = !bits[i];
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! let state = ga.start()?;
//! assert!(matches!(state, State::Finished(_)));
//! assert!(ga.best_fitness().is_some());
//! # Ok::<(), u_evolve::EvoError>(())
//! ```

pub mod error;
pub mod grid;
pub mod lifecycle;
mod operators;
pub mod population;
pub mod processor;
pub mod random;
pub mod store;
pub mod topology;

pub use error::{BoxError, EvoError, Result};
pub use lifecycle::{
    EvolveFn, FinishReason, Ga, GaConfig, Island, Lifecycle, Running, StartOption, State,
    StopHandle, StopPolicy,
};
pub use operators::Selection;
pub use population::{Chromosome, Fitness, Goal, Population};
pub use processor::{ParallelismConfig, Processor};
pub use random::{create_rng, EvoRng};
pub use store::{Store, StoreKey};
pub use topology::{
    migrate, Cell, Cellular, CellularConfig, CellularStep, CellularType, Distributed,
    DistributedConfig, Factory, Panmictic, PanmicticConfig, PopulationTopology, Replacement,
    Topology,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::error::{EvoError, Result};
    pub use crate::grid::{Dimens, Neighborhood};
    pub use crate::lifecycle::{
        FinishReason, Ga, GaConfig, Island, Lifecycle, Running, StartOption, State, StopHandle,
        StopPolicy,
    };
    pub use crate::operators::Selection;
    pub use crate::population::{Chromosome, Goal};
    pub use crate::random::EvoRng;
    pub use crate::topology::{
        Cell, Cellular, CellularConfig, CellularStep, CellularType, Distributed,
        DistributedConfig, Panmictic, PanmicticConfig, Replacement,
    };
}
