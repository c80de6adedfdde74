//! Cache configuration and builder.
//!
//! All range checks happen here, before any shard is allocated, so a
//! rejected configuration never yields a partially built cache.
//!
//! ## Example
//!
//! ```rust
//! use shardcache::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new()
//!     .shards(64)
//!     .shard_capacity(4096)
//!     .sample_size(5)
//!     .try_build::<String>()
//!     .unwrap();
//! assert_eq!(cache.shard_count(), 64);
//! assert_eq!(cache.capacity(), 64 * 4096);
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::cache::ShardedCache;
use crate::clock::{Clock, MonotonicClock};
use crate::error::ConfigError;
use crate::policy::DEFAULT_SAMPLE_SIZE;

/// Allowed number of shards.
pub const SHARD_COUNT_RANGE: RangeInclusive<usize> = 32..=256;

/// Allowed live keys per shard.
pub const SHARD_CAPACITY_RANGE: RangeInclusive<usize> = 1024..=65536;

/// Allowed eviction sample sizes.
pub const SAMPLE_SIZE_RANGE: RangeInclusive<usize> = 1..=16;

/// Validated cache parameters.
#[derive(Clone)]
pub struct CacheConfig {
    pub shard_count: usize,
    pub shard_capacity: usize,
    pub sample_size: usize,
    /// Seeds every shard's sampling generator (mixed with the shard index).
    pub seed: u64,
    pub clock: Arc<dyn Clock>,
}

impl CacheConfig {
    /// Checks every parameter against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SHARD_COUNT_RANGE.contains(&self.shard_count) {
            return Err(ConfigError::ShardCount {
                value: self.shard_count,
                min: *SHARD_COUNT_RANGE.start(),
                max: *SHARD_COUNT_RANGE.end(),
            });
        }
        if !SHARD_CAPACITY_RANGE.contains(&self.shard_capacity) {
            return Err(ConfigError::ShardCapacity {
                value: self.shard_capacity,
                min: *SHARD_CAPACITY_RANGE.start(),
                max: *SHARD_CAPACITY_RANGE.end(),
            });
        }
        if !SAMPLE_SIZE_RANGE.contains(&self.sample_size) {
            return Err(ConfigError::SampleSize {
                value: self.sample_size,
                min: *SAMPLE_SIZE_RANGE.start(),
                max: *SAMPLE_SIZE_RANGE.end(),
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: *SHARD_COUNT_RANGE.start(),
            shard_capacity: *SHARD_CAPACITY_RANGE.start(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: 0,
            clock: Arc::new(MonotonicClock),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("shard_count", &self.shard_count)
            .field("shard_capacity", &self.shard_capacity)
            .field("sample_size", &self.sample_size)
            .field("seed", &self.seed)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Fluent builder for [`ShardedCache`].
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Starts from [`CacheConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shards(mut self, shard_count: usize) -> Self {
        self.config.shard_count = shard_count;
        self
    }

    pub fn shard_capacity(mut self, capacity: usize) -> Self {
        self.config.shard_capacity = capacity;
        self
    }

    /// Candidates compared per eviction.
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.config.sample_size = sample_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Time source for TTL checks.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.config.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Validates the configuration and allocates every shard.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is out of range.
    pub fn try_build<V>(self) -> Result<ShardedCache<V>, ConfigError> {
        ShardedCache::with_config(self.config)
    }
}
