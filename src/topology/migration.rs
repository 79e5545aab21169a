//! Ring migration between islands.
//!
//! With islands `0..n`, chromosomes flow `i → i + 1` and wrap from the last
//! island back to the first:
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! [0] ──► [1] ──► [2] ──► ... ──► [n-1]
//! ```
//!
//! Emigrants are sampled without replacement from the source island and
//! overwrite randomly chosen chromosomes of the destination. Every island
//! keeps its size; the same chromosome may end up on several islands.

use crate::error::{EvoError, Result};
use crate::lifecycle::Island;
use crate::population::Chromosome;
use rand::seq::index::sample;
use rand::Rng;
use tracing::debug;

/// Migrates `floor(percent × smallest island size)` chromosomes from every
/// island to its successor on the ring.
///
/// The last island is sampled first. Then, from the last-but-one island
/// down to the first, each island is sampled afresh and its emigrants
/// overwrite random positions of the next island, before that island is
/// itself overwritten. Finally the last island's emigrants land on the
/// first island.
///
/// Returns the number of chromosomes each island sent; `0` for a single
/// island or when the count rounds down to zero.
///
/// # Errors
/// `percent` outside `(0, 1]` is rejected with
/// [`EvoError::InvalidConfig`].
pub fn migrate<V, F, R>(islands: &mut [Box<dyn Island<V, F>>], percent: f64, rng: &mut R) -> Result<usize>
where
    V: Clone,
    F: Clone,
    R: Rng,
{
    if !(percent > 0.0 && percent <= 1.0) {
        return Err(EvoError::config(format!(
            "migration percent must be in (0, 1], got {percent}"
        )));
    }
    if islands.len() < 2 {
        return Ok(0);
    }
    let smallest = islands
        .iter()
        .map(|island| island.island_size())
        .min()
        .unwrap_or(0);
    let count = (percent * smallest as f64).floor() as usize;
    if count == 0 {
        return Ok(0);
    }

    let last = islands.len() - 1;
    let wrapped = emigrants(&*islands[last], count, rng);
    for i in (0..last).rev() {
        let migrants = emigrants(&*islands[i], count, rng);
        settle(&mut *islands[i + 1], migrants, rng);
    }
    settle(&mut *islands[0], wrapped, rng);

    debug!(count, islands = islands.len(), "migration complete");
    Ok(count)
}

fn emigrants<V, F, R>(island: &dyn Island<V, F>, count: usize, rng: &mut R) -> Vec<Chromosome<V, F>>
where
    V: Clone,
    F: Clone,
    R: Rng,
{
    sample(rng, island.island_size(), count)
        .into_iter()
        .map(|index| island.chromosome(index).clone())
        .collect()
}

fn settle<V, F, R>(island: &mut dyn Island<V, F>, migrants: Vec<Chromosome<V, F>>, rng: &mut R)
where
    R: Rng,
{
    let positions = sample(rng, island.island_size(), migrants.len());
    for (position, migrant) in positions.into_iter().zip(migrants) {
        island.replace_chromosome(position, migrant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Ga, GaConfig};
    use crate::random::create_rng;
    use crate::topology::{Panmictic, PanmicticConfig};
    use proptest::prelude::*;

    fn island(tag: u32, size: usize) -> Box<dyn Island<u32, f64>> {
        let config = PanmicticConfig::default().with_population_size(size);
        let topology = Panmictic::with_values(config, vec![tag; size]).unwrap();
        Box::new(Ga::new(topology, GaConfig::default(), |_| Ok(())).unwrap())
    }

    fn tags(island: &dyn Island<u32, f64>) -> Vec<u32> {
        (0..island.island_size())
            .map(|i| island.chromosome(i).value)
            .collect()
    }

    #[test]
    fn test_rejects_bad_percent() {
        let mut islands = vec![island(0, 4), island(1, 4)];
        let mut rng = create_rng(1);
        for percent in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(migrate(&mut islands, percent, &mut rng).is_err());
        }
    }

    #[test]
    fn test_single_island_is_noop() {
        let mut islands = vec![island(3, 5)];
        let mut rng = create_rng(1);
        assert_eq!(migrate(&mut islands, 1.0, &mut rng).unwrap(), 0);
        assert_eq!(tags(&*islands[0]), vec![3; 5]);
    }

    #[test]
    fn test_count_rounds_down() {
        let mut islands = vec![island(0, 9), island(1, 3)];
        let mut rng = create_rng(1);
        assert_eq!(migrate(&mut islands, 0.3, &mut rng).unwrap(), 0);
        assert_eq!(migrate(&mut islands, 0.5, &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_ring_flow() {
        let mut islands = vec![island(0, 10), island(1, 10), island(2, 10)];
        let mut rng = create_rng(7);
        assert_eq!(migrate(&mut islands, 0.3, &mut rng).unwrap(), 3);

        // island i received exactly 3 chromosomes from its predecessor
        for (i, island) in islands.iter().enumerate() {
            let from = (i + islands.len() - 1) % islands.len();
            let tags = tags(&**island);
            assert_eq!(tags.iter().filter(|&&t| t == from as u32).count(), 3);
            assert_eq!(tags.iter().filter(|&&t| t == i as u32).count(), 7);
        }
    }

    proptest! {
        #[test]
        fn prop_migration_conserves_sizes(
            sizes in proptest::collection::vec(1usize..12, 1..6),
            percent in 0.01f64..=1.0,
            seed in any::<u64>(),
        ) {
            let mut islands: Vec<_> = sizes
                .iter()
                .enumerate()
                .map(|(tag, &size)| island(tag as u32, size))
                .collect();
            let mut rng = create_rng(seed);
            let count = migrate(&mut islands, percent, &mut rng).unwrap();

            let smallest = *sizes.iter().min().unwrap();
            prop_assert!(count <= smallest);
            let after: Vec<usize> = islands.iter().map(|i| i.island_size()).collect();
            prop_assert_eq!(after, sizes.clone());

            // every tag that left an island arrived on its successor
            if sizes.len() > 1 {
                for (i, island) in islands.iter().enumerate() {
                    let from = ((i + sizes.len() - 1) % sizes.len()) as u32;
                    let received = tags(&**island).iter().filter(|&&t| t == from).count();
                    prop_assert_eq!(received, count);
                }
            }
        }
    }
}
