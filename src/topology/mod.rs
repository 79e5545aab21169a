//! Population topologies.
//!
//! A topology owns the chromosomes of one run and decides who may breed
//! with whom:
//!
//! - [`Panmictic`]: a single population where any chromosome may mate with
//!   any other.
//! - [`Cellular`]: chromosomes live on a toroidal grid and only interact
//!   with their neighborhood.
//! - [`Distributed`]: a ring of islands, each a full lifecycle of its own,
//!   exchanging migrants between rounds.
//!
//! Operators are inherent methods of [`Ga`](crate::Ga) specialized to the
//! topology they need, so an evolution step only offers the operators that
//! make sense for its population layout.

mod cellular;
mod distributed;
mod migration;
mod panmictic;

pub use cellular::{Cell, Cellular, CellularConfig, CellularStep, CellularType, Replacement};
pub use distributed::{Distributed, DistributedConfig};
pub use migration::migrate;
pub use panmictic::{Panmictic, PanmicticConfig};

use crate::error::Result;
use crate::lifecycle::{StartOption, StopHandle};
use crate::population::{Chromosome, Fitness, Goal, Population};
use crate::random::EvoRng;
use std::sync::Arc;

/// Produces a fresh random value for a chromosome.
pub type Factory<V> = Arc<dyn Fn(&mut EvoRng) -> V + Send + Sync>;

/// Population layout driven by a [`Ga`](crate::Ga) lifecycle.
pub trait Topology: Send + 'static {
    /// Chromosome value type.
    type Value: Clone + Send + Sync + 'static;

    /// Fitness type.
    type Fit: Fitness;

    /// Fills the population on first start; a no-op once initialized.
    fn initialize(&mut self, rng: &mut EvoRng) -> Result<()>;

    /// Re-randomizes every chromosome.
    fn reset(&mut self, rng: &mut EvoRng) -> Result<()>;

    /// Called with the start option before every launch of the loop.
    fn prepare(&mut self, _option: StartOption) {}

    /// Called once with the owning lifecycle's handle.
    fn attach(&mut self, _owner: &StopHandle) {}

    /// Optimization direction.
    fn goal(&self) -> Goal;

    /// Number of chromosomes.
    fn size(&self) -> usize;

    /// Chromosome at `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    fn chromosome(&self, index: usize) -> &Chromosome<Self::Value, Self::Fit>;

    /// Replaces the chromosome at `index`.
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    fn replace_chromosome(
        &mut self,
        index: usize,
        chromosome: Chromosome<Self::Value, Self::Fit>,
    );
}

/// A topology backed by a single [`Population`].
pub trait PopulationTopology: Topology {
    /// The population.
    fn population(&self) -> &Population<Self::Value, Self::Fit>;

    /// Mutable access to the population.
    fn population_mut(&mut self) -> &mut Population<Self::Value, Self::Fit>;
}
