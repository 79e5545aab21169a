//! Lifecycle configuration.
//!
//! [`GaConfig`] holds the settings shared by every topology: the random
//! seed and the parallel execution settings.

use crate::error::Result;
use crate::processor::ParallelismConfig;

/// Configuration shared by all lifecycles.
///
/// # Examples
///
/// ```
/// use u_evolve::GaConfig;
///
/// let config = GaConfig::default().with_seed(42).with_workers(4);
/// assert_eq!(config.seed, Some(42));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GaConfig {
    /// Random seed for reproducibility.
    ///
    /// `None` uses a random seed.
    pub seed: Option<u64>,

    /// Parallel execution settings.
    ///
    /// `None` runs every operator sequentially on the lifecycle's own
    /// random source. Results are reproducible for a fixed seed and a fixed
    /// worker count, but differ between worker counts.
    pub parallelism: Option<ParallelismConfig>,
}

impl GaConfig {
    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the parallel execution settings.
    pub fn with_parallelism(mut self, parallelism: ParallelismConfig) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Runs operators on `workers` workers of the global rayon pool.
    pub fn with_workers(self, workers: usize) -> Self {
        self.with_parallelism(ParallelismConfig::new(workers))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(parallelism) = &self.parallelism {
            parallelism.validate()?;
        }
        Ok(())
    }
}
