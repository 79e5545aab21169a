//! Seeded random sources.
//!
//! Every lifecycle owns exactly one [`EvoRng`]. Parallel regions never
//! touch it; instead they draw one seed per worker up front with
//! [`worker_seeds`] and build independent generators from those seeds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random generator used throughout the engine.
pub type EvoRng = StdRng;

/// Creates a generator from a fixed seed.
pub fn create_rng(seed: u64) -> EvoRng {
    StdRng::seed_from_u64(seed)
}

/// Draws `count` successive seeds from `rng`, in worker-index order.
pub fn worker_seeds<R: Rng>(rng: &mut R, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.random::<u64>()).collect()
}

/// Returns a fresh seed when the caller did not fix one.
pub(crate) fn seed_or_random(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = create_rng(7);
        let mut b = create_rng(7);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn test_worker_seeds_advance_owner() {
        let mut a = create_rng(42);
        let mut b = create_rng(42);
        let seeds = worker_seeds(&mut a, 4);
        assert_eq!(seeds.len(), 4);
        let replay: Vec<u64> = (0..4).map(|_| b.random::<u64>()).collect();
        assert_eq!(seeds, replay);
        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn test_seed_or_random_keeps_fixed_seed() {
        assert_eq!(seed_or_random(Some(11)), 11);
    }
}
