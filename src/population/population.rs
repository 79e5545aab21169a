//! Fixed-capacity chromosome container.

use super::chromosome::Chromosome;
use super::types::{Fitness, Goal};
use crate::error::{EvoError, Result};
use std::ops::{Index, IndexMut, Range};

/// Ordered, fixed-capacity collection of chromosomes.
///
/// `len()` is the active size; the region between `len()` and
/// `capacity()` is slack that operators may fill with offspring before
/// selection trims the population back.
#[derive(Debug, Clone, PartialEq)]
pub struct Population<V, F> {
    chromosomes: Vec<Chromosome<V, F>>,
    capacity: usize,
    initialized: bool,
}

impl<V, F: Fitness> Population<V, F> {
    /// Creates an empty, uninitialized population.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chromosomes: Vec::with_capacity(capacity),
            capacity,
            initialized: false,
        }
    }

    /// Creates an initialized population from explicit values.
    ///
    /// Returns `Err` if there are more values than `capacity`.
    pub fn from_values(values: Vec<V>, capacity: usize) -> Result<Self> {
        if values.len() > capacity {
            return Err(EvoError::config(format!(
                "{} initial values exceed population capacity {capacity}",
                values.len()
            )));
        }
        let mut chromosomes = Vec::with_capacity(capacity);
        chromosomes.extend(values.into_iter().map(Chromosome::new));
        Ok(Self {
            chromosomes,
            capacity,
            initialized: true,
        })
    }

    /// Fills the population up to `size` chromosomes produced by `factory`
    /// and marks it initialized.
    pub fn initialize<G>(&mut self, size: usize, mut factory: G) -> Result<()>
    where
        G: FnMut() -> V,
    {
        if size > self.capacity {
            return Err(EvoError::config(format!(
                "population size {size} exceeds capacity {}",
                self.capacity
            )));
        }
        self.chromosomes.clear();
        self.chromosomes
            .extend((0..size).map(|_| Chromosome::new(factory())));
        self.initialized = true;
        Ok(())
    }

    /// Re-randomizes the chromosomes in `range` in place.
    pub fn reset_range<G>(&mut self, range: Range<usize>, mut factory: G) -> Result<()>
    where
        G: FnMut() -> V,
    {
        if range.end > self.chromosomes.len() {
            return Err(EvoError::config(format!(
                "reset range {range:?} exceeds population size {}",
                self.chromosomes.len()
            )));
        }
        for chromosome in &mut self.chromosomes[range] {
            chromosome.set_value(factory());
        }
        Ok(())
    }

    /// Whether the population holds its initial chromosomes.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Active size.
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    /// Returns `true` if the active region is empty.
    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Maximum number of chromosomes, slack included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining slack.
    pub fn free_slots(&self) -> usize {
        self.capacity - self.chromosomes.len()
    }

    /// Appends a chromosome into the slack region.
    pub fn push(&mut self, chromosome: Chromosome<V, F>) -> Result<()> {
        if self.chromosomes.len() >= self.capacity {
            return Err(EvoError::config(format!(
                "population is full (capacity {})",
                self.capacity
            )));
        }
        self.chromosomes.push(chromosome);
        Ok(())
    }

    /// Shrinks the active region to `size`, dropping the tail.
    pub fn truncate(&mut self, size: usize) {
        self.chromosomes.truncate(size);
    }

    /// Chromosome at `index`.
    pub fn get(&self, index: usize) -> Option<&Chromosome<V, F>> {
        self.chromosomes.get(index)
    }

    /// Mutable chromosome at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Chromosome<V, F>> {
        self.chromosomes.get_mut(index)
    }

    /// Active chromosomes.
    pub fn as_slice(&self) -> &[Chromosome<V, F>] {
        &self.chromosomes
    }

    /// Active chromosomes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [Chromosome<V, F>] {
        &mut self.chromosomes
    }

    /// Iterates over the active chromosomes.
    pub fn iter(&self) -> std::slice::Iter<'_, Chromosome<V, F>> {
        self.chromosomes.iter()
    }

    /// Swaps two chromosomes.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.chromosomes.swap(a, b);
    }

    /// Stable sort, best first according to `goal`.
    pub fn sort(&mut self, goal: Goal) {
        self.chromosomes
            .sort_by(|a, b| goal.compare(a.fitness, b.fitness));
    }

    /// Index of the best evaluated chromosome.
    ///
    /// Ties resolve to the lowest index. Returns `None` if nothing has
    /// been evaluated yet.
    pub fn best_index(&self, goal: Goal) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, c) in self.chromosomes.iter().enumerate() {
            if c.fitness.is_none() {
                continue;
            }
            match best {
                Some(b) if !goal.is_better(c.fitness, self.chromosomes[b].fitness) => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// The best evaluated chromosome.
    pub fn best(&self, goal: Goal) -> Option<&Chromosome<V, F>> {
        self.best_index(goal).map(|i| &self.chromosomes[i])
    }

    /// Consumes the population, returning its chromosomes.
    pub(crate) fn take_chromosomes(&mut self) -> Vec<Chromosome<V, F>> {
        std::mem::take(&mut self.chromosomes)
    }

    /// Puts back chromosomes taken with [`take_chromosomes`](Self::take_chromosomes).
    pub(crate) fn restore_chromosomes(&mut self, chromosomes: Vec<Chromosome<V, F>>) {
        self.chromosomes = chromosomes;
    }
}

impl<V, F> Index<usize> for Population<V, F> {
    type Output = Chromosome<V, F>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.chromosomes[index]
    }
}

impl<V, F> IndexMut<usize> for Population<V, F> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.chromosomes[index]
    }
}

impl<'a, V, F> IntoIterator for &'a Population<V, F> {
    type Item = &'a Chromosome<V, F>;
    type IntoIter = std::slice::Iter<'a, Chromosome<V, F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chromosomes.iter()
    }
}
