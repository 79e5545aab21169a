//! Chromosomes, fitness values and the population container.

mod chromosome;
#[allow(clippy::module_inception)]
mod population;
mod types;

pub use chromosome::Chromosome;
pub use population::Population;
pub use types::{Fitness, Goal};
