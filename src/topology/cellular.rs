//! Spatially structured population on an N-dimensional toroidal grid.
//!
//! Every cell holds one chromosome and only interacts with the cells of its
//! [`Neighborhood`]. Two update disciplines are supported:
//!
//! - [`CellularType::Synchronous`]: every cell computes its next state from
//!   a read-only snapshot of the grid; all cells are committed together.
//! - [`CellularType::Asynchronous`]: a cell's new state is committed at
//!   once and seen by cells updated after it. Sequentially this sweeps the
//!   grid in index order. In parallel each cell sits behind its own lock
//!   and neighbors are cloned under their lock, so the interleaving (and
//!   the result) depends on scheduling.
//!
//! # References
//!
//! - Alba & Dorronsoro (2008), *Cellular Genetic Algorithms*

use super::{Factory, PopulationTopology, Topology};
use crate::error::{EvoError, Result};
use crate::grid::{Dimens, NeighborOffsets, Neighborhood};
use crate::lifecycle::Ga;
use crate::operators::{clamp_chance, Selection};
use crate::population::{Chromosome, Fitness, Goal, Population};
use crate::random::EvoRng;
use rand::Rng;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cell update discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellularType {
    /// All cells read the previous generation.
    #[default]
    Synchronous,
    /// Cells read whatever their neighbors currently hold.
    Asynchronous,
}

/// Configuration of a cellular population.
///
/// # Examples
///
/// ```
/// use u_evolve::grid::{Dimens, Neighborhood};
/// use u_evolve::{CellularConfig, CellularType};
///
/// let config = CellularConfig::new(Dimens::new([10, 10])?)
///     .with_neighborhood(Neighborhood::von_neumann(1)?)
///     .with_cellular_type(CellularType::Asynchronous)
///     .with_elitism(true);
/// assert!(config.validate().is_ok());
/// # Ok::<(), u_evolve::EvoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CellularConfig {
    /// Grid shape; one chromosome per cell.
    pub dimens: Dimens,

    /// Neighborhood geometry (default: Moore, radius 1).
    pub neighborhood: Neighborhood,

    /// Update discipline.
    pub cellular_type: CellularType,

    /// Excludes the best cell from every update pass.
    pub elitism: bool,

    /// Optimization direction.
    pub goal: Goal,
}

impl CellularConfig {
    /// Creates a configuration for the given grid.
    pub fn new(dimens: Dimens) -> Self {
        Self {
            dimens,
            neighborhood: Neighborhood::default(),
            cellular_type: CellularType::default(),
            elitism: false,
            goal: Goal::default(),
        }
    }

    /// Sets the neighborhood geometry.
    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    /// Sets the update discipline.
    pub fn with_cellular_type(mut self, cellular_type: CellularType) -> Self {
        self.cellular_type = cellular_type;
        self
    }

    /// Enables or disables elitism.
    pub fn with_elitism(mut self, elitism: bool) -> Self {
        self.elitism = elitism;
        self
    }

    /// Sets the optimization direction.
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.neighborhood.offsets(&self.dimens).map(|_| ())
    }
}

/// Population laid out on a wrapping grid.
pub struct Cellular<V, F> {
    config: CellularConfig,
    offsets: Option<NeighborOffsets>,
    population: Population<V, F>,
    factory: Option<Factory<V>>,
}

impl<V, F: Fitness> Cellular<V, F> {
    /// Creates a grid whose cells are drawn from `factory` on first start.
    pub fn new<G>(config: CellularConfig, factory: G) -> Result<Self>
    where
        G: Fn(&mut EvoRng) -> V + Send + Sync + 'static,
    {
        let offsets = config.neighborhood.offsets(&config.dimens)?;
        let size = config.dimens.size();
        Ok(Self {
            config,
            offsets,
            population: Population::with_capacity(size),
            factory: Some(Arc::new(factory)),
        })
    }

    /// Creates a grid from explicit cell values in row-major order.
    pub fn with_values(config: CellularConfig, values: Vec<V>) -> Result<Self> {
        let offsets = config.neighborhood.offsets(&config.dimens)?;
        let size = config.dimens.size();
        if values.len() != size {
            return Err(EvoError::config(format!(
                "grid of {size} cells needs {size} initial values, got {}",
                values.len()
            )));
        }
        Ok(Self {
            config,
            offsets,
            population: Population::from_values(values, size)?,
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
    pub fn config(&self) -> &CellularConfig {
        &self.config
    }

    /// Grid shape.
    pub fn dimens(&self) -> &Dimens {
        &self.config.dimens
    }

    /// Precomputed offsets; `None` for a custom neighborhood.
    pub fn offsets(&self) -> Option<&NeighborOffsets> {
        self.offsets.as_ref()
    }

    /// Neighbor indices of `cell`.
    ///
    /// Returns `Err` if a custom neighborhood yields an index outside the
    /// grid.
    pub fn neighbors(&self, cell: usize) -> Result<Vec<usize>> {
        let dimens = &self.config.dimens;
        match (&self.offsets, &self.config.neighborhood) {
            (Some(offsets), _) => Ok(offsets.neighbors_of(cell, dimens)),
            (None, Neighborhood::Custom(geometry)) => {
                let neighbors = geometry.neighbors(cell, dimens);
                match neighbors.iter().find(|&&n| n >= dimens.size()) {
                    Some(n) => Err(EvoError::config(format!(
                        "custom neighborhood of cell {cell} returned {n}, grid has {} cells",
                        dimens.size()
                    ))),
                    None => Ok(neighbors),
                }
            }
            (None, _) => Ok(Vec::new()),
        }
    }

    /// Chromosome at a grid coordinate.
    pub fn at(&self, coords: &[usize]) -> Option<&Chromosome<V, F>> {
        self.config
            .dimens
            .to_index(coords)
            .and_then(|i| self.population.get(i))
    }

    fn factory(&self) -> Result<&Factory<V>> {
        self.factory
            .as_ref()
            .ok_or_else(|| EvoError::config("cellular population has no factory"))
    }
}

impl<V, F> Topology for Cellular<V, F>
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
        self.reset(rng)
    }

    fn reset(&mut self, rng: &mut EvoRng) -> Result<()> {
        let factory = Arc::clone(self.factory()?);
        let size = self.config.dimens.size();
        self.population.initialize(size, || factory(rng))
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

impl<V, F> PopulationTopology for Cellular<V, F>
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

impl<V: fmt::Debug, F: fmt::Debug> fmt::Debug for Cellular<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cellular")
            .field("config", &self.config)
            .field("population", &self.population)
            .finish_non_exhaustive()
    }
}

/// View of one cell handed to an update function.
#[derive(Debug)]
pub struct Cell<'a, V, F> {
    /// Linear index of the cell.
    pub index: usize,
    /// The cell's chromosome.
    pub current: &'a Chromosome<V, F>,
    /// Chromosomes of the neighbors, in neighborhood order.
    pub neighbors: &'a [&'a Chromosome<V, F>],
    /// Linear indices of the neighbors (same order).
    pub neighbor_indices: &'a [usize],
}

/// Whether a cell's offspring replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Replacement {
    /// The offspring always replaces the cell.
    Always,
    /// The offspring replaces the cell only if strictly better.
    #[default]
    IfBetter,
}

type FitnessOp<V, F> = Arc<dyn Fn(&V) -> Result<F> + Send + Sync>;
type CrossoverOp<V> = Arc<dyn Fn(&V, &V, &mut EvoRng) -> Result<V> + Send + Sync>;
type MutationOp<V> = Arc<dyn Fn(&mut V, &mut EvoRng) -> Result<()> + Send + Sync>;

/// The canonical cellular step: pick a mate among the neighbors, recombine,
/// mutate, evaluate, replace.
///
/// # Examples
///
/// ```
/// use u_evolve::{CellularStep, EvoRng, Replacement, Selection};
/// use rand::Rng;
///
/// let step = CellularStep::new(|x: &f64| x.abs())
///     .with_selection(Selection::Tournament(2))
///     .with_crossover(0.9, |a: &f64, b: &f64, _: &mut EvoRng| Ok((a + b) / 2.0))
///     .with_mutation(0.1, |x: &mut f64, rng: &mut EvoRng| {
///         *x += rng.random_range(-1.0..1.0);
///         Ok(())
///     })
///     .with_replacement(Replacement::IfBetter);
/// # let _ = step;
/// ```
pub struct CellularStep<V, F> {
    fitness: FitnessOp<V, F>,
    selection: Selection,
    crossover: Option<(f64, CrossoverOp<V>)>,
    mutation: Option<(f64, MutationOp<V>)>,
    replacement: Replacement,
}

impl<V: Clone, F: Fitness> CellularStep<V, F> {
    /// Creates a step evaluating offspring with `fitness`.
    pub fn new<E>(fitness: E) -> Self
    where
        E: Fn(&V) -> F + Send + Sync + 'static,
    {
        Self::try_new(move |value| Ok(fitness(value)))
    }

    /// Creates a step with a fallible fitness function.
    pub fn try_new<E>(fitness: E) -> Self
    where
        E: Fn(&V) -> Result<F> + Send + Sync + 'static,
    {
        Self {
            fitness: Arc::new(fitness),
            selection: Selection::default(),
            crossover: None,
            mutation: None,
            replacement: Replacement::default(),
        }
    }

    /// Sets how the mate is chosen among the neighbors.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Recombines the cell with its mate with probability `chance`.
    pub fn with_crossover<C>(mut self, chance: f64, op: C) -> Self
    where
        C: Fn(&V, &V, &mut EvoRng) -> Result<V> + Send + Sync + 'static,
    {
        self.crossover = Some((clamp_chance(chance), Arc::new(op)));
        self
    }

    /// Mutates the offspring with probability `chance`.
    pub fn with_mutation<M>(mut self, chance: f64, op: M) -> Self
    where
        M: Fn(&mut V, &mut EvoRng) -> Result<()> + Send + Sync + 'static,
    {
        self.mutation = Some((clamp_chance(chance), Arc::new(op)));
        self
    }

    /// Sets the replacement rule.
    pub fn with_replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = replacement;
        self
    }

    /// Computes the next state of one cell.
    pub fn apply(&self, cell: Cell<'_, V, F>, goal: Goal, rng: &mut EvoRng) -> Result<Chromosome<V, F>> {
        let mate = if cell.neighbors.is_empty() {
            cell.current
        } else {
            let pick = self.selection.select_by(
                cell.neighbors.len(),
                |i| cell.neighbors[i].fitness,
                goal,
                rng,
            );
            cell.neighbors[pick]
        };

        let mut value = match &self.crossover {
            Some((chance, op)) if rng.random_bool(*chance) => {
                op(&cell.current.value, &mate.value, rng)?
            }
            _ => cell.current.value.clone(),
        };
        if let Some((chance, op)) = &self.mutation {
            if rng.random_bool(*chance) {
                op(&mut value, rng)?;
            }
        }

        let fitness = (self.fitness)(&value)?;
        let child = Chromosome::evaluated(value, fitness);
        Ok(match self.replacement {
            Replacement::Always => child,
            Replacement::IfBetter if goal.is_better(child.fitness, cell.current.fitness) => child,
            Replacement::IfBetter => cell.current.clone(),
        })
    }
}

impl<V, F> fmt::Debug for CellularStep<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellularStep")
            .field("selection", &self.selection)
            .field("crossover", &self.crossover.as_ref().map(|(c, _)| c))
            .field("mutation", &self.mutation.as_ref().map(|(c, _)| c))
            .field("replacement", &self.replacement)
            .finish()
    }
}

fn lock<T>(cell: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    cell.lock().map_err(|_| EvoError::Poisoned)
}

/// Unwraps every cell, poisoned or not. The flag is `true` if any was
/// poisoned.
fn recover_cells<T>(cells: Vec<Mutex<T>>) -> (Vec<T>, bool) {
    let mut poisoned = false;
    let values = cells
        .into_iter()
        .map(|cell| {
            poisoned |= cell.is_poisoned();
            cell.into_inner().unwrap_or_else(PoisonError::into_inner)
        })
        .collect();
    (values, poisoned)
}

impl<V, F> Ga<Cellular<V, F>>
where
    V: Clone + Send + Sync + 'static,
    F: Fitness,
{
    /// Replaces every cell (except the protected best one, with elitism) by
    /// `update(cell, rng)`, following the configured update discipline.
    pub fn update_cells<U>(&mut self, update: U) -> Result<()>
    where
        U: Fn(Cell<'_, V, F>, &mut EvoRng) -> Result<Chromosome<V, F>> + Sync + Send,
    {
        match self.topology().config.cellular_type {
            CellularType::Synchronous => self.update_synchronous(update),
            CellularType::Asynchronous => self.update_asynchronous(update),
        }
    }

    /// Runs `step` on every cell.
    pub fn evolve_cells(&mut self, step: &CellularStep<V, F>) -> Result<()> {
        let goal = self.topology().config.goal;
        self.update_cells(|cell, rng| step.apply(cell, goal, rng))
    }

    fn protected_cell(&self) -> Option<usize> {
        let topology = self.topology();
        if topology.config.elitism {
            topology.population.best_index(topology.config.goal)
        } else {
            None
        }
    }

    fn update_synchronous<U>(&mut self, update: U) -> Result<()>
    where
        U: Fn(Cell<'_, V, F>, &mut EvoRng) -> Result<Chromosome<V, F>> + Sync + Send,
    {
        let protected = self.protected_cell();
        let (topology, rng, processor) = self.parts();
        let grid: &Cellular<V, F> = topology;
        let snapshot = grid.population.as_slice();

        let next = processor.map(rng, 0..snapshot.len(), |index, rng| {
            if protected == Some(index) {
                return Ok(None);
            }
            let indices = grid.neighbors(index)?;
            let neighbors: Vec<&Chromosome<V, F>> = indices.iter().map(|&n| &snapshot[n]).collect();
            let cell = Cell {
                index,
                current: &snapshot[index],
                neighbors: &neighbors,
                neighbor_indices: &indices,
            };
            update(cell, rng).map(Some)
        })?;

        for (index, chromosome) in next.into_iter().enumerate() {
            if let Some(chromosome) = chromosome {
                topology.population[index] = chromosome;
            }
        }
        Ok(())
    }

    fn update_asynchronous<U>(&mut self, update: U) -> Result<()>
    where
        U: Fn(Cell<'_, V, F>, &mut EvoRng) -> Result<Chromosome<V, F>> + Sync + Send,
    {
        let protected = self.protected_cell();
        let (topology, rng, processor) = self.parts();
        let cells: Vec<Mutex<Chromosome<V, F>>> = topology
            .population
            .take_chromosomes()
            .into_iter()
            .map(Mutex::new)
            .collect();
        let grid: &Cellular<V, F> = topology;

        let outcome = processor.map(rng, 0..cells.len(), |index, rng| {
            if protected == Some(index) {
                return Ok(());
            }
            let indices = grid.neighbors(index)?;
            // one lock at a time, so workers never wait on each other in a cycle
            let current = lock(&cells[index])?.clone();
            let neighbors = indices
                .iter()
                .map(|&n| lock(&cells[n]).map(|c| c.clone()))
                .collect::<Result<Vec<_>>>()?;
            let views: Vec<&Chromosome<V, F>> = neighbors.iter().collect();
            let cell = Cell {
                index,
                current: &current,
                neighbors: &views,
                neighbor_indices: &indices,
            };
            let next = update(cell, rng)?;
            *lock(&cells[index])? = next;
            Ok(())
        });

        let (chromosomes, poisoned) = recover_cells(cells);
        topology.population.restore_chromosomes(chromosomes);
        outcome?;
        if poisoned {
            return Err(EvoError::Poisoned);
        }
        Ok(())
    }
}
