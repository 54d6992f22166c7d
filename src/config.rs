//! Configuration for VTable
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VtError};
use crate::store::DEFAULT_INDEX_INTERVAL;

/// Main configuration for a VTable session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the record store
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── records.dat      (framed records)
    ///     └── records.idx      (sparse key index)
    pub data_dir: PathBuf,

    /// Every `index_interval`-th record gets a sparse index entry
    pub index_interval: u32,

    /// Sync strategy: when the writer fsyncs appended batches
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Window Cache Configuration
    // -------------------------------------------------------------------------
    /// Rows per window (unit of caching and fetching)
    pub window_size: usize,

    /// Max resident windows before eviction
    pub cache_capacity: usize,

    // -------------------------------------------------------------------------
    // Seeding Configuration
    // -------------------------------------------------------------------------
    /// Row count the seeder fills the store up to
    pub target_rows: u64,

    /// Rows appended per seeding batch
    pub batch_size: usize,

    /// Shortest generated value (characters)
    pub min_len: usize,

    /// Longest generated value (characters)
    pub max_len: usize,

    /// Fixed RNG seed for reproducible data (None = entropy)
    pub seed: Option<u64>,
}

/// Store sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every appended batch (safest, slowest)
    EveryBatch,

    /// fsync only when the writer is closed
    OnClose,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./vtable_data"),
            index_interval: DEFAULT_INDEX_INTERVAL,
            sync_strategy: SyncStrategy::EveryBatch,
            window_size: 1000,
            cache_capacity: 8,
            target_rows: 3_000_000,
            batch_size: 10_000,
            min_len: 7,
            max_len: 30,
            seed: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the cache, store or seeder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(VtError::Config("window_size must be at least 1".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(VtError::Config("cache_capacity must be at least 1".to_string()));
        }
        if self.index_interval == 0 {
            return Err(VtError::Config("index_interval must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(VtError::Config("batch_size must be at least 1".to_string()));
        }
        if self.min_len > self.max_len {
            return Err(VtError::Config(format!(
                "min_len ({}) exceeds max_len ({})",
                self.min_len, self.max_len
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for the record store)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sparse index interval
    pub fn index_interval(mut self, interval: u32) -> Self {
        self.config.index_interval = interval;
        self
    }

    /// Set the store sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the window size (rows per fetch)
    pub fn window_size(mut self, rows: usize) -> Self {
        self.config.window_size = rows;
        self
    }

    /// Set the maximum number of resident windows
    pub fn cache_capacity(mut self, windows: usize) -> Self {
        self.config.cache_capacity = windows;
        self
    }

    /// Set the seeding target row count
    pub fn target_rows(mut self, rows: u64) -> Self {
        self.config.target_rows = rows;
        self
    }

    /// Set the seeding batch size
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.config.batch_size = rows;
        self
    }

    /// Set the generated value length range (inclusive)
    pub fn value_len(mut self, min_len: usize, max_len: usize) -> Self {
        self.config.min_len = min_len;
        self.config.max_len = max_len;
        self
    }

    /// Fix the seeding RNG seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
