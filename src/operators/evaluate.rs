//! Fitness evaluation for single-population topologies.

use crate::error::Result;
use crate::lifecycle::Ga;
use crate::population::Population;
use crate::topology::PopulationTopology;

impl<T: PopulationTopology> Ga<T> {
    /// The population.
    pub fn population(&self) -> &Population<T::Value, T::Fit> {
        self.topology().population()
    }

    /// Mutable access to the population.
    pub fn population_mut(&mut self) -> &mut Population<T::Value, T::Fit> {
        self.topology_mut().population_mut()
    }

    /// Evaluates every chromosome whose fitness is unknown.
    pub fn evaluate<E>(&mut self, fitness: E) -> Result<()>
    where
        E: Fn(&T::Value) -> T::Fit + Sync + Send,
    {
        self.try_evaluate(|value| Ok(fitness(value)))
    }

    /// Fallible variant of [`evaluate`](Self::evaluate).
    ///
    /// The first failure (in worker order) is returned; chromosomes
    /// evaluated before it keep their fitness.
    pub fn try_evaluate<E>(&mut self, fitness: E) -> Result<()>
    where
        E: Fn(&T::Value) -> Result<T::Fit> + Sync + Send,
    {
        self.evaluate_where(false, fitness)
    }

    /// Evaluates every chromosome, including already evaluated ones.
    pub fn reevaluate<E>(&mut self, fitness: E) -> Result<()>
    where
        E: Fn(&T::Value) -> Result<T::Fit> + Sync + Send,
    {
        self.evaluate_where(true, fitness)
    }

    fn evaluate_where<E>(&mut self, all: bool, fitness: E) -> Result<()>
    where
        E: Fn(&T::Value) -> Result<T::Fit> + Sync + Send,
    {
        let (topology, rng, processor) = self.parts();
        let population = topology.population_mut();
        let len = population.len();
        processor.process(rng, population.as_mut_slice(), 0..len, |_, chromosome, _| {
            if all || chromosome.fitness.is_none() {
                chromosome.fitness = Some(fitness(&chromosome.value)?);
            }
            Ok(())
        })
    }
}
