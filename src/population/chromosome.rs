//! A single candidate solution.

use super::types::Fitness;

/// A candidate solution: an opaque value plus its fitness, if evaluated.
///
/// `Clone` is a deep copy: mutating the clone's value never touches the
/// original.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome<V, F> {
    /// The solution representation, owned by user operators.
    pub value: V,

    /// Fitness of `value`, or `None` if not evaluated since the last change.
    pub fitness: Option<F>,
}

impl<V, F: Fitness> Chromosome<V, F> {
    /// Creates an unevaluated chromosome.
    pub fn new(value: V) -> Self {
        Self {
            value,
            fitness: None,
        }
    }

    /// Creates an already evaluated chromosome.
    pub fn evaluated(value: V, fitness: F) -> Self {
        Self {
            value,
            fitness: Some(fitness),
        }
    }

    /// Returns `true` if the fitness is known.
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// Replaces the value and forgets the fitness.
    pub fn set_value(&mut self, value: V) {
        self.value = value;
        self.fitness = None;
    }

    /// Marks the chromosome as needing re-evaluation.
    pub fn invalidate(&mut self) {
        self.fitness = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_deep() {
        let original: Chromosome<Vec<bool>, usize> = Chromosome::evaluated(vec![true, false], 1);
        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.value[1] = true;
        assert_eq!(original.value, vec![true, false]);
        assert_ne!(copy, original);
    }

    #[test]
    fn test_set_value_invalidates() {
        let mut c: Chromosome<i32, f64> = Chromosome::evaluated(3, 9.0);
        c.set_value(4);
        assert!(!c.is_evaluated());
        assert_eq!(c.value, 4);
    }
}
