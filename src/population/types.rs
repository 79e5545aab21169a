//! Fitness values and optimization direction.

use std::cmp::Ordering;

/// Marker trait for fitness values.
///
/// Fitness must support comparison and be cheaply copyable. Whether lower
/// or higher is better is decided by [`Goal`]; the engine only compares.
///
/// Built-in implementations exist for the float and integer primitives.
pub trait Fitness: PartialOrd + Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Converts the fitness to `f64` for weighting and logging.
    fn to_f64(self) -> f64;
}

macro_rules! impl_fitness {
    ($($t:ty),*) => {
        $(
            impl Fitness for $t {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_fitness!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

/// Optimization direction.
///
/// Sorting a population puts the best chromosome first, so `Minimize`
/// sorts ascending and `Maximize` descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Goal {
    /// Lower fitness is better.
    #[default]
    Minimize,
    /// Higher fitness is better.
    Maximize,
}

impl Goal {
    /// Orders two optional fitness values so that the better one is `Less`.
    ///
    /// Unevaluated (`None`) chromosomes rank after every evaluated one;
    /// incomparable values (NaN) are treated as equal.
    pub fn compare<F: Fitness>(self, a: Option<F>, b: Option<F>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => {
                let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
                match self {
                    Goal::Minimize => ord,
                    Goal::Maximize => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Returns `true` if `a` is strictly better than `b`.
    pub fn is_better<F: Fitness>(self, a: Option<F>, b: Option<F>) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Returns `true` if `fitness` reaches `target` (equal or better).
    pub fn reaches<F: Fitness>(self, fitness: F, target: F) -> bool {
        match self {
            Goal::Minimize => fitness <= target,
            Goal::Maximize => fitness >= target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimize_order() {
        assert_eq!(Goal::Minimize.compare(Some(1.0), Some(2.0)), Ordering::Less);
        assert!(Goal::Minimize.is_better(Some(1), Some(2)));
    }

    #[test]
    fn test_maximize_order() {
        assert_eq!(Goal::Maximize.compare(Some(1.0), Some(2.0)), Ordering::Greater);
        assert!(Goal::Maximize.is_better(Some(9u32), Some(2u32)));
    }

    #[test]
    fn test_unevaluated_ranks_last() {
        for goal in [Goal::Minimize, Goal::Maximize] {
            assert_eq!(goal.compare(Some(5), None), Ordering::Less);
            assert_eq!(goal.compare::<i32>(None, Some(5)), Ordering::Greater);
            assert_eq!(goal.compare::<i32>(None, None), Ordering::Equal);
        }
    }

    #[test]
    fn test_nan_is_equal() {
        assert_eq!(Goal::Minimize.compare(Some(f64::NAN), Some(1.0)), Ordering::Equal);
    }

    #[test]
    fn test_reaches() {
        assert!(Goal::Maximize.reaches(100usize, 100));
        assert!(!Goal::Maximize.reaches(99usize, 100));
        assert!(Goal::Minimize.reaches(0.5, 1.0));
    }
}
