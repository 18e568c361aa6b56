//! Stream and evaluation configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Draws per candidate slot before a colliding id is kept anyway.
pub const DEFAULT_MAX_RETRIES: usize = 10;

/// Most decimal places a reported metric may keep; an `f64` holds no more.
pub const MAX_DECIMALS: u32 = 15;

/// Batch stream configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Positive triples per batch (default: 512).
    pub batch_size: usize,
    /// Negative candidates per positive triple (default: 64).
    pub negative_sample_size: usize,
    /// Draw a fresh permutation of the training set every epoch (default: true).
    pub shuffle: bool,
    /// Background workers per corruption mode; 0 samples on the caller's thread (default: 0).
    pub num_workers: usize,
    /// Batches each worker may queue ahead of the consumer (default: 4).
    pub prefetch_capacity: usize,
    /// Base seed; worker `k` uses `seed ^ k` (default: 42).
    pub seed: u64,
    /// Re-draw negatives that reproduce a known triple (default: true).
    pub avoid_known: bool,
    /// Re-draws per negative slot when avoiding known triples (default: 10).
    pub max_retries: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: 512,
            negative_sample_size: 64,
            shuffle: true,
            num_workers: 0,
            prefetch_capacity: 4,
            seed: 42,
            avoid_known: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl StreamConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_negative_sample_size(mut self, n: usize) -> Self {
        self.negative_sample_size = n;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_prefetch_capacity(mut self, capacity: usize) -> Self {
        self.prefetch_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_avoid_known(mut self, avoid: bool) -> Self {
        self.avoid_known = avoid;
        self
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.num_workers > 0 && self.prefetch_capacity == 0 {
            return Err(Error::InvalidConfig(
                "prefetch_capacity must be at least 1 when workers are enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Filtered evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Decimal places kept in reported metrics (default: 4).
    pub decimals: u32,
    /// Rank test triples on the rayon pool (default: true).
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            decimals: 4,
            parallel: true,
        }
    }
}

impl EvalConfig {
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(Error::InvalidConfig(format!(
                "decimals must be at most {MAX_DECIMALS}, got {}",
                self.decimals
            )));
        }
        Ok(())
    }
}
