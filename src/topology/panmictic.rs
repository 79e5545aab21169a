//! Single flat population.
//!
//! # Layout
//!
//! ```text
//! [0, elitism)          elites, untouched by select/crossover/mutate
//! [elitism, size)       working region
//! [size, capacity)      buffer for offspring, trimmed by select
//! ```

use super::{Factory, PopulationTopology, Topology};
use crate::error::{EvoError, Result};
use crate::lifecycle::Ga;
use crate::operators::{clamp_chance, Selection};
use crate::population::{Chromosome, Fitness, Goal, Population};
use crate::random::EvoRng;
use rand::Rng;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Configuration of a panmictic population.
///
/// # Examples
///
/// ```
/// use u_evolve::{Goal, PanmicticConfig};
///
/// let config = PanmicticConfig::default()
///     .with_population_size(200)
///     .with_buffer_size(50)
///     .with_elitism(4)
///     .with_goal(Goal::Maximize);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.capacity(), 250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanmicticConfig {
    /// Number of chromosomes kept after every selection.
    pub population_size: usize,

    /// Extra slots for offspring produced before selection.
    pub buffer_size: usize,

    /// Number of leading chromosomes preserved unchanged by variation.
    ///
    /// Pair with [`Ga::sort`] so the leading chromosomes are the best ones.
    pub elitism: usize,

    /// Optimization direction.
    pub goal: Goal,
}

impl Default for PanmicticConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            buffer_size: 0,
            elitism: 0,
            goal: Goal::Minimize,
        }
    }
}

impl PanmicticConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the offspring buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the elite count.
    pub fn with_elitism(mut self, count: usize) -> Self {
        self.elitism = count;
        self
    }

    /// Sets the optimization direction.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    /// Total slots: population plus buffer.
    pub fn capacity(&self) -> usize {
        self.population_size.saturating_add(self.buffer_size)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(EvoError::config("population_size must be positive"));
        }
        if self.elitism >= self.population_size {
            return Err(EvoError::config(format!(
                "elitism ({}) must be less than population_size ({})",
                self.elitism, self.population_size
            )));
        }
        if self.population_size.checked_add(self.buffer_size).is_none() {
            return Err(EvoError::config("population capacity overflows usize"));
        }
        Ok(())
    }
}

/// Flat population where any chromosome may mate with any other.
pub struct Panmictic<V, F> {
    config: PanmicticConfig,
    population: Population<V, F>,
    factory: Option<Factory<V>>,
}

impl<V, F: Fitness> Panmictic<V, F> {
    /// Creates a topology whose population is drawn from `factory` on first
    /// start.
    pub fn new<G>(config: PanmicticConfig, factory: G) -> Result<Self>
    where
        G: Fn(&mut EvoRng) -> V + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            population: Population::with_capacity(config.capacity()),
            factory: Some(Arc::new(factory)),
        })
    }

    /// Creates a topology from explicit initial values.
    ///
    /// `values.len()` must equal `config.population_size`. Without a
    /// factory (see [`with_factory`](Self::with_factory)) the population
    /// cannot be re-randomized.
    pub fn with_values(config: PanmicticConfig, values: Vec<V>) -> Result<Self> {
        config.validate()?;
        if values.len() != config.population_size {
            return Err(EvoError::config(format!(
                "expected {} initial values, got {}",
                config.population_size,
                values.len()
            )));
        }
        Ok(Self {
            config,
            population: Population::from_values(values, config.capacity())?,
            factory: None,
        })
    }

    /// Sets the factory used by resets.
    pub fn with_factory<G>(mut self, factory: G) -> Self
    where
        G: Fn(&mut EvoRng) -> V + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &PanmicticConfig {
        &self.config
    }

    /// Number of preserved leading chromosomes.
    pub fn elitism(&self) -> usize {
        self.config.elitism
    }

    fn factory(&self) -> Result<&Factory<V>> {
        self.factory
            .as_ref()
            .ok_or_else(|| EvoError::config("panmictic population has no factory"))
    }

    /// Working region: `[elitism, len)`.
    fn working_range(&self) -> Range<usize> {
        self.config.elitism.min(self.population.len())..self.population.len()
    }
}

impl<V, F> Topology for Panmictic<V, F>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    type Value = V;
    type Fit = F;

    fn initialize(&mut self, rng: &mut EvoRng) -> Result<()> {
        if self.population.is_initialized() {
            return Ok(());
        }
        let factory = Arc::clone(self.factory()?);
        self.population
            .initialize(self.config.population_size, || factory(rng))
    }

    fn reset(&mut self, rng: &mut EvoRng) -> Result<()> {
        let factory = Arc::clone(self.factory()?);
        self.population
            .initialize(self.config.population_size, || factory(rng))
    }

    fn goal(&self) -> Goal {
        self.config.goal
    }

    fn size(&self) -> usize {
        self.population.len()
    }

    fn chromosome(&self, index: usize) -> &Chromosome<V, F> {
        &self.population[index]
    }

    fn replace_chromosome(&mut self, index: usize, chromosome: Chromosome<V, F>) {
        self.population[index] = chromosome;
    }
}

impl<V, F> PopulationTopology for Panmictic<V, F>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    fn population(&self) -> &Population<V, F> {
        &self.population
    }

    fn population_mut(&mut self) -> &mut Population<V, F> {
        &mut self.population
    }
}

impl<V: fmt::Debug, F: fmt::Debug> fmt::Debug for Panmictic<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panmictic")
            .field("config", &self.config)
            .field("population", &self.population)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

impl<V, F> Ga<Panmictic<V, F>>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    /// Sorts the population best first (stable).
    pub fn sort(&mut self) {
        let goal = self.topology().config.goal;
        self.population_mut().sort(goal);
    }

    /// Refills the working region with parents drawn from the whole active
    /// population, then trims it back to `population_size`.
    ///
    /// Draws see the population as it was before the call, including any
    /// buffered offspring. Elites stay in place.
    pub fn select(&mut self, selection: Selection) -> Result<()> {
        let (topology, rng, processor) = self.parts();
        let elitism = topology.config.elitism;
        let target = topology.config.population_size;
        let goal = topology.config.goal;

        let pool = topology.population.as_slice();
        if pool.is_empty() {
            return Ok(());
        }
        let picked = processor.map(rng, elitism..target, |_, rng| {
            Ok(pool[selection.select(pool, goal, rng)].clone())
        })?;

        let population = &mut topology.population;
        population.truncate(elitism);
        for chromosome in picked {
            population.push(chromosome)?;
        }
        Ok(())
    }

    /// Recombines consecutive pairs `(i, i + 1)` of the working region.
    ///
    /// With probability `chance` a pair is replaced by the two children
    /// `op` returns, which lose their fitness. A trailing unpaired
    /// chromosome is left alone.
    pub fn crossover<C>(&mut self, chance: f64, op: C) -> Result<()>
    where
        C: Fn(&V, &V, &mut EvoRng) -> Result<(V, V)> + Sync + Send,
    {
        let chance = clamp_chance(chance);
        let (topology, rng, processor) = self.parts();
        let range = topology.working_range();
        processor.process_stepped(
            rng,
            topology.population.as_mut_slice(),
            range,
            2,
            |_, pair, rng| {
                if !rng.random_bool(chance) {
                    return Ok(());
                }
                if let [a, b] = pair {
                    let (first, second) = op(&a.value, &b.value, rng)?;
                    a.set_value(first);
                    b.set_value(second);
                }
                Ok(())
            },
        )
    }

    /// Mutates each chromosome of the working region with probability
    /// `chance`; mutated chromosomes lose their fitness.
    pub fn mutate<M>(&mut self, chance: f64, op: M) -> Result<()>
    where
        M: Fn(&mut V, &mut EvoRng) -> Result<()> + Sync + Send,
    {
        let chance = clamp_chance(chance);
        let (topology, rng, processor) = self.parts();
        let range = topology.working_range();
        processor.process(
            rng,
            topology.population.as_mut_slice(),
            range,
            |_, chromosome, rng| {
                if rng.random_bool(chance) {
                    op(&mut chromosome.value, rng)?;
                    chromosome.invalidate();
                }
                Ok(())
            },
        )
    }

    /// Appends up to `count` offspring to the buffer region.
    ///
    /// `op` receives the population as it was before the call. Returns the
    /// number of offspring added, limited by the free slots.
    pub fn breed_offspring<B>(&mut self, count: usize, op: B) -> Result<usize>
    where
        B: Fn(&[Chromosome<V, F>], &mut EvoRng) -> Result<V> + Sync + Send,
    {
        let (topology, rng, processor) = self.parts();
        let count = count.min(topology.population.free_slots());
        let parents = topology.population.as_slice();
        let offspring = processor.map(rng, 0..count, |_, rng| op(parents, rng))?;
        for value in offspring {
            topology.population.push(Chromosome::new(value))?;
        }
        Ok(count)
    }

    /// Re-randomizes the chromosomes in `range` with the factory.
    pub fn reset_range(&mut self, range: Range<usize>) -> Result<()> {
        let (topology, rng, _) = self.parts();
        let factory = Arc::clone(topology.factory()?);
        topology.population.reset_range(range, || factory(rng))
    }
}
