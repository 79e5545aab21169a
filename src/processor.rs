//! Sequential or strided-parallel iteration over index ranges.
//!
//! [`Processor`] is the primitive every operator is built on. It applies an
//! action to each index of a range, either in order on the owner's random
//! source, or across a fixed number of rayon workers.
//!
//! # Striding
//!
//! With `limit` workers, worker `w` handles `start + w`, `start + w + limit`,
//! `start + w + 2·limit`, ... Before the workers start, exactly `limit`
//! seeds are drawn from the owner's generator (in worker order), and each
//! worker owns a generator built from its seed. Results are therefore
//! reproducible for a fixed `limit`, but not across different `limit`
//! values.
//!
//! All workers join before a call returns.

use crate::error::{EvoError, Result};
use crate::lifecycle::Control;
use crate::random::{create_rng, worker_seeds, EvoRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Parallel execution settings.
///
/// # Examples
///
/// ```
/// use u_evolve::ParallelismConfig;
///
/// let config = ParallelismConfig::new(4);
/// assert!(config.validate().is_ok());
/// assert!(ParallelismConfig::new(1).validate().is_err());
/// ```
#[derive(Clone)]
pub struct ParallelismConfig {
    /// Number of workers (and of pre-drawn worker seeds). Must be at least 2.
    pub workers_count: usize,

    /// Dedicated rayon pool; the global pool is used when `None`.
    pub pool: Option<Arc<ThreadPool>>,
}

impl ParallelismConfig {
    /// Creates a configuration running on the global rayon pool.
    pub fn new(workers_count: usize) -> Self {
        Self {
            workers_count,
            pool: None,
        }
    }

    /// Runs workers on a dedicated pool.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers_count <= 1 {
            return Err(EvoError::config(format!(
                "parallel workers_count must be at least 2, got {}",
                self.workers_count
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ParallelismConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelismConfig")
            .field("workers_count", &self.workers_count)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

/// Applies actions over index ranges, sequentially or across workers.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    parallelism: Option<ParallelismConfig>,
    control: Option<Arc<Control>>,
}

impl Processor {
    /// A processor that always runs in index order.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// A processor fanning work to `config.workers_count` workers.
    pub fn parallel(config: ParallelismConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parallelism: Some(config),
            control: None,
        })
    }

    pub(crate) fn with_control(mut self, control: Arc<Control>) -> Self {
        self.control = Some(control);
        self
    }

    /// Number of workers; `1` when sequential.
    pub fn limit(&self) -> usize {
        self.parallelism.as_ref().map_or(1, |p| p.workers_count)
    }

    /// Returns `true` if work is spread across workers.
    pub fn is_parallel(&self) -> bool {
        self.limit() > 1
    }

    fn check_abort(&self) -> Result<()> {
        match &self.control {
            Some(control) if control.abort_requested() => Err(EvoError::Aborted),
            _ => Ok(()),
        }
    }

    /// Runs one job per worker, on the dedicated pool if there is one.
    ///
    /// Output keeps worker order.
    fn run_workers<J, T, W>(&self, jobs: Vec<J>, work: W) -> Vec<Result<T>>
    where
        J: Send,
        T: Send,
        W: Fn(J) -> Result<T> + Sync + Send,
    {
        let pool = self.parallelism.as_ref().and_then(|p| p.pool.as_ref());
        let run = || jobs.into_par_iter().map(&work).collect::<Vec<_>>();
        match pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Applies `action(index, &mut items[index], rng)` for every index in
    /// `range`.
    ///
    /// Sequential mode passes the owner's `rng`; parallel mode passes each
    /// worker's own generator. On failure the error of the lowest worker
    /// index is returned, after every worker has finished.
    pub fn process<T, A>(
        &self,
        rng: &mut EvoRng,
        items: &mut [T],
        range: Range<usize>,
        action: A,
    ) -> Result<()>
    where
        T: Send,
        A: Fn(usize, &mut T, &mut EvoRng) -> Result<()> + Sync + Send,
    {
        let start = range.start;
        let slice = &mut items[range];
        let limit = self.limit();

        if limit <= 1 {
            for (offset, item) in slice.iter_mut().enumerate() {
                self.check_abort()?;
                action(start + offset, item, rng)?;
            }
            return Ok(());
        }

        let seeds = worker_seeds(rng, limit);
        let mut partitions: Vec<Vec<(usize, &mut T)>> = (0..limit).map(|_| Vec::new()).collect();
        for (offset, item) in slice.iter_mut().enumerate() {
            partitions[offset % limit].push((start + offset, item));
        }
        let jobs: Vec<_> = seeds.into_iter().zip(partitions).collect();

        let results = self.run_workers(jobs, |(seed, partition)| {
            let mut worker_rng = create_rng(seed);
            for (index, item) in partition {
                self.check_abort()?;
                action(index, item, &mut worker_rng)?;
            }
            Ok(())
        });
        results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    /// Stepped variant of [`process`](Self::process).
    ///
    /// Visits `range.start`, `range.start + step`, ... and hands the action
    /// the chunk `items[i..min(i + step, range.end)]` starting at each
    /// visited index `i`. Chunks are disjoint and are strided across
    /// workers like single indices.
    pub fn process_stepped<T, A>(
        &self,
        rng: &mut EvoRng,
        items: &mut [T],
        range: Range<usize>,
        step: usize,
        action: A,
    ) -> Result<()>
    where
        T: Send,
        A: Fn(usize, &mut [T], &mut EvoRng) -> Result<()> + Sync + Send,
    {
        if step == 0 {
            return Err(EvoError::config("processor step must be positive"));
        }
        let start = range.start;
        let mut chunks: Vec<(usize, &mut [T])> = items[range]
            .chunks_mut(step)
            .enumerate()
            .map(|(k, chunk)| (start + k * step, chunk))
            .collect();
        let len = chunks.len();
        self.process(rng, &mut chunks, 0..len, |_, (index, chunk), rng| {
            action(*index, &mut **chunk, rng)
        })
    }

    /// Computes `action(index, rng)` for every index in `range` and returns
    /// the results in index order.
    ///
    /// Useful when workers must read shared data (a snapshot of the
    /// population) and results are committed afterwards.
    pub fn map<T, A>(&self, rng: &mut EvoRng, range: Range<usize>, action: A) -> Result<Vec<T>>
    where
        T: Send,
        A: Fn(usize, &mut EvoRng) -> Result<T> + Sync + Send,
    {
        let mut slots: Vec<Option<T>> = (0..range.len()).map(|_| None).collect();
        let start = range.start;
        let len = slots.len();
        self.process(rng, &mut slots, 0..len, |offset, slot, rng| {
            *slot = Some(action(start + offset, rng)?);
            Ok(())
        })?;
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use crate::lifecycle::StopHandle;
    use std::sync::Mutex;

    fn parallel(workers: usize) -> Processor {
        Processor::parallel(ParallelismConfig::new(workers)).unwrap()
    }

    #[test]
    fn test_parallel_config_rejects_single_worker() {
        assert!(Processor::parallel(ParallelismConfig::new(1)).is_err());
        assert!(Processor::parallel(ParallelismConfig::new(0)).is_err());
    }

    #[test]
    fn test_sequential_visits_in_order() {
        let processor = Processor::sequential();
        let mut rng = create_rng(1);
        let mut items = vec![0usize; 6];
        let order = Mutex::new(Vec::new());
        processor
            .process(&mut rng, &mut items, 1..5, |i, item, _| {
                *item = i * 10;
                order.lock().unwrap().push(i);
                Ok(())
            })
            .unwrap();
        assert_eq!(items, vec![0, 10, 20, 30, 40, 0]);
        assert_eq!(order.into_inner().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sequential_uses_owner_rng() {
        let processor = Processor::sequential();
        let mut rng = create_rng(9);
        let mut items = vec![0u64; 3];
        processor
            .process(&mut rng, &mut items, 0..3, |_, item, rng| {
                *item = rng.random();
                Ok(())
            })
            .unwrap();

        let mut replay = create_rng(9);
        let expected: Vec<u64> = (0..3).map(|_| replay.random()).collect();
        assert_eq!(items, expected);
    }

    #[test]
    fn test_parallel_striding() {
        let processor = parallel(3);
        let mut rng = create_rng(1);
        let mut items = vec![0u64; 10];
        processor
            .process(&mut rng, &mut items, 0..10, |_, item, rng| {
                *item = rng.random();
                Ok(())
            })
            .unwrap();

        // worker w draws for w, w + 3, w + 6, ... from its own generator
        let mut owner = create_rng(1);
        let mut expected = vec![0u64; 10];
        for (w, seed) in worker_seeds(&mut owner, 3).into_iter().enumerate() {
            let mut worker_rng = create_rng(seed);
            for i in (w..10).step_by(3) {
                expected[i] = worker_rng.random();
            }
        }
        assert_eq!(items, expected);
    }

    #[test]
    fn test_parallel_seeds_drawn_from_owner() {
        let processor = parallel(4);
        let mut rng = create_rng(5);
        let mut items = vec![0u64; 4];
        processor
            .process(&mut rng, &mut items, 0..4, |_, item, rng| {
                *item = rng.random();
                Ok(())
            })
            .unwrap();

        let mut owner = create_rng(5);
        let expected: Vec<u64> = worker_seeds(&mut owner, 4)
            .into_iter()
            .map(|s| create_rng(s).random())
            .collect();
        assert_eq!(items, expected);
        // exactly `limit` draws were consumed from the owner
        assert_eq!(rng.random::<u64>(), owner.random::<u64>());
    }

    #[test]
    fn test_parallel_is_reproducible() {
        let run = || {
            let processor = parallel(4);
            let mut rng = create_rng(77);
            let mut items = vec![0u32; 50];
            processor
                .process(&mut rng, &mut items, 5..50, |_, item, rng| {
                    *item = rng.random_range(0..1000);
                    Ok(())
                })
                .unwrap();
            items
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_dedicated_pool() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let processor =
            Processor::parallel(ParallelismConfig::new(2).with_pool(Arc::new(pool))).unwrap();
        let mut rng = create_rng(3);
        let mut items = vec![1; 8];
        processor
            .process(&mut rng, &mut items, 0..8, |_, item, _| {
                *item += 1;
                Ok(())
            })
            .unwrap();
        assert!(items.iter().all(|&v| v == 2));
    }

    #[test]
    fn test_error_propagates() {
        for processor in [Processor::sequential(), parallel(2)] {
            let mut rng = create_rng(1);
            let mut items = vec![0; 6];
            let result = processor.process(&mut rng, &mut items, 0..6, |i, _, _| {
                if i == 3 {
                    Err(EvoError::operator("bad index"))
                } else {
                    Ok(())
                }
            });
            assert!(matches!(result, Err(EvoError::Operator(_))));
        }
    }

    #[test]
    fn test_stepped_chunks() {
        for processor in [Processor::sequential(), parallel(2)] {
            let mut rng = create_rng(1);
            let mut items: Vec<usize> = (0..9).collect();
            processor
                .process_stepped(&mut rng, &mut items, 1..8, 2, |i, chunk, _| {
                    assert_eq!(chunk[0], i);
                    chunk.reverse();
                    Ok(())
                })
                .unwrap();
            assert_eq!(items, vec![0, 2, 1, 4, 3, 6, 5, 7, 8]);
        }
    }

    #[test]
    fn test_stepped_rejects_zero_step() {
        let mut rng = create_rng(1);
        let mut items = vec![0; 4];
        let result =
            Processor::sequential().process_stepped(&mut rng, &mut items, 0..4, 0, |_, _, _| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn test_map_keeps_index_order() {
        for processor in [Processor::sequential(), parallel(3)] {
            let mut rng = create_rng(1);
            let squares = processor.map(&mut rng, 2..9, |i, _| Ok(i * i)).unwrap();
            assert_eq!(squares, vec![4, 9, 16, 25, 36, 49, 64]);
        }
    }

    #[test]
    fn test_abort_stops_processing() {
        let handle = StopHandle::new();
        handle.control().begin().unwrap();
        let processor = Processor::sequential().with_control(Arc::clone(handle.control()));
        let mut rng = create_rng(1);
        let mut items = vec![0; 5];
        let result = processor.process(&mut rng, &mut items, 0..5, |i, item, _| {
            if i == 1 {
                handle.abort();
            }
            *item = 1;
            Ok(())
        });
        assert!(matches!(result, Err(EvoError::Aborted)));
        assert_eq!(items, vec![1, 1, 0, 0, 0]);
    }
}
