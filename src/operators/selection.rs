//! Parent selection strategies.
//!
//! Selection determines which chromosomes are chosen as parents. Different
//! strategies provide different selection pressure. All of them respect the
//! [`Goal`], and an unevaluated chromosome always ranks below every
//! evaluated one.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use crate::population::{Chromosome, Fitness, Goal};
use rand::Rng;

/// Selection strategy for choosing parents.
///
/// # Examples
///
/// ```
/// use u_evolve::Selection;
///
/// // Tournament with size 3 (moderate selection pressure)
/// let sel = Selection::Tournament(3);
/// assert_eq!(sel, Selection::default());
///
/// // Roulette wheel (fitness-proportionate)
/// let sel = Selection::Roulette;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// Tournament selection: pick `k` chromosomes at random, select the best.
    ///
    /// Higher `k` = stronger selection pressure.
    /// - k=2: light pressure (good for diversity)
    /// - k=3-5: moderate pressure (typical default)
    /// - k>5: strong pressure (risk of premature convergence)
    ///
    /// # Complexity
    /// O(k) per selection
    Tournament(usize),

    /// Fitness-proportionate (roulette wheel) selection.
    ///
    /// Weights are the distance from the worst evaluated fitness, so the
    /// best chromosome gets the largest slice under either goal.
    ///
    /// **Warning**: Susceptible to super-individual dominance when
    /// fitness variance is high.
    ///
    /// # Complexity
    /// O(n) per selection (linear scan)
    Roulette,

    /// Rank-based selection.
    ///
    /// Chromosomes are sorted best first and selection probability is
    /// proportional to `n - rank`, not raw fitness value. This avoids the
    /// scaling problems of roulette wheel selection.
    ///
    /// Reference: Baker (1985), "Adaptive Selection Methods for Genetic
    /// Algorithms"
    ///
    /// # Complexity
    /// O(n log n) per selection
    Rank,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects a parent index from `population`.
    ///
    /// # Panics
    /// Panics if `population` is empty.
    pub fn select<V, F: Fitness, R: Rng>(
        &self,
        population: &[Chromosome<V, F>],
        goal: Goal,
        rng: &mut R,
    ) -> usize {
        self.select_by(population.len(), |i| population[i].fitness, goal, rng)
    }

    /// Selects an index in `0..len`, reading fitness through `fitness_at`.
    ///
    /// Lets callers select from borrowed views such as a cell's neighbors.
    ///
    /// # Panics
    /// Panics if `len == 0`.
    pub fn select_by<F, G, R>(&self, len: usize, fitness_at: G, goal: Goal, rng: &mut R) -> usize
    where
        F: Fitness,
        G: Fn(usize) -> Option<F>,
        R: Rng,
    {
        assert!(len > 0, "cannot select from empty population");

        match self {
            Selection::Tournament(k) => tournament(len, &fitness_at, *k, goal, rng),
            Selection::Roulette => roulette(len, &fitness_at, goal, rng),
            Selection::Rank => rank(len, &fitness_at, goal, rng),
        }
    }
}

/// Tournament selection: pick k random chromosomes, return best.
fn tournament<F, G, R>(n: usize, fitness_at: &G, k: usize, goal: Goal, rng: &mut R) -> usize
where
    F: Fitness,
    G: Fn(usize) -> Option<F>,
    R: Rng,
{
    let k = k.max(1);

    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if goal.is_better(fitness_at(idx), fitness_at(best_idx)) {
            best_idx = idx;
        }
    }
    best_idx
}

/// Roulette wheel selection.
///
/// weight_i = |fitness_i - worst| + epsilon, unevaluated weight = epsilon.
fn roulette<F, G, R>(n: usize, fitness_at: &G, goal: Goal, rng: &mut R) -> usize
where
    F: Fitness,
    G: Fn(usize) -> Option<F>,
    R: Rng,
{
    if n == 1 {
        return 0;
    }

    let fitnesses: Vec<Option<f64>> = (0..n)
        .map(|i| fitness_at(i).map(|f| f.to_f64()).filter(|f| f.is_finite()))
        .collect();

    let worst = match goal {
        Goal::Minimize => fitnesses.iter().flatten().cloned().fold(f64::NEG_INFINITY, f64::max),
        Goal::Maximize => fitnesses.iter().flatten().cloned().fold(f64::INFINITY, f64::min),
    };

    let epsilon = 1e-10;

    let weights: Vec<f64> = fitnesses
        .iter()
        .map(|f| match f {
            Some(f) => (f - worst).abs() + epsilon,
            None => epsilon,
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }

    n - 1 // floating-point fallback
}

/// Rank-based selection using linear ranking.
fn rank<F, G, R>(n: usize, fitness_at: &G, goal: Goal, rng: &mut R) -> usize
where
    F: Fitness,
    G: Fn(usize) -> Option<F>,
    R: Rng,
{
    if n == 1 {
        return 0;
    }

    // best first; stable, so equal fitness keeps index order
    let mut indexed: Vec<(usize, Option<F>)> = (0..n).map(|i| (i, fitness_at(i))).collect();
    indexed.sort_by(|a, b| goal.compare(a.1, b.1));

    // rank 0 (best) gets weight n
    let total: f64 = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;

    for (rank, &(original_idx, _)) in indexed.iter().enumerate() {
        let weight = (n - rank) as f64;
        cumulative += weight;
        if cumulative > threshold {
            return original_idx;
        }
    }

    indexed[n - 1].0
}
