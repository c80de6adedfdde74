//! Sharded cache facade.
//!
//! [`ShardedCache`] owns a fixed array of [`Shard`]s and routes every
//! operation to exactly one of them by MurmurHash2 of the key. It never
//! takes a lock of its own and never touches two shards in one call.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//! use shardcache::cache::ShardedCache;
//!
//! let cache: ShardedCache<String> = ShardedCache::new(32, 1024).unwrap();
//!
//! cache.set("greeting", "hello".to_string(), Duration::ZERO).unwrap();
//! assert_eq!(cache.get("greeting").unwrap().as_deref(), Some(&"hello".to_string()));
//!
//! // add only stores when the key is absent or expired
//! assert!(!cache.add("greeting", "hi".to_string(), Duration::ZERO).unwrap());
//!
//! cache.delete("greeting").unwrap();
//! assert_eq!(cache.get("greeting").unwrap(), None);
//!
//! // empty keys are rejected before any shard is touched
//! assert!(cache.get("").is_err());
//! ```
//!
//! ## Thread Safety
//!
//! `ShardedCache<V>` is `Send + Sync` when `V: Send + Sync`. Share it with
//! `Arc`; reads on one shard run in parallel, writes serialize per shard.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::builder::CacheConfig;
use crate::ds::ShardSelector;
use crate::error::{CacheError, ConfigError, InvariantError, Result};
use crate::metrics::CacheMetricsSnapshot;
use crate::store::{SetOutcome, Shard};

pub struct ShardedCache<V> {
    shards: Box<[Shard<V>]>,
    selector: ShardSelector,
    config: CacheConfig,
}

#[inline]
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::EmptyKey);
    }
    Ok(())
}

impl<V> ShardedCache<V> {
    /// Creates a cache of `shard_count` shards holding up to
    /// `shard_capacity` keys each, with default sampling and clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `shard_count` is outside [32, 256] or
    /// `shard_capacity` is outside [1024, 65536].
    pub fn new(shard_count: usize, shard_capacity: usize) -> std::result::Result<Self, ConfigError> {
        Self::with_config(CacheConfig {
            shard_count,
            shard_capacity,
            ..CacheConfig::default()
        })
    }

    /// Creates a cache from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is out of range.
    pub fn with_config(config: CacheConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let shards: Box<[Shard<V>]> = (0..config.shard_count)
            .map(|index| {
                Shard::new(
                    index,
                    config.shard_capacity,
                    config.sample_size,
                    config.seed ^ (index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
                    Arc::clone(&config.clock),
                )
            })
            .collect();

        tracing::debug!(
            shards = config.shard_count,
            shard_capacity = config.shard_capacity,
            sample_size = config.sample_size,
            "sharded cache created"
        );

        Ok(Self {
            shards,
            selector: ShardSelector::new(config.shard_count),
            config,
        })
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.selector.shard_for_key(key)]
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// A zero `ttl` never expires.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] for an empty key; [`CacheError::Invariant`]
    /// if the full shard could not choose an eviction victim.
    pub fn set(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        validate_key(key)?;
        self.shard(key).set(key, value, ttl, false)?;
        Ok(())
    }

    /// Stores `value` only if `key` is absent or its entry has expired.
    ///
    /// Returns `Ok(false)` when a live entry already holds the key.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn add(&self, key: &str, value: V, ttl: Duration) -> Result<bool> {
        validate_key(key)?;
        let outcome = self.shard(key).set(key, value, ttl, true)?;
        Ok(outcome.stored())
    }

    /// Like [`set`](Self::set), but reports how the value was stored.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn upsert(&self, key: &str, value: V, ttl: Duration) -> Result<SetOutcome> {
        validate_key(key)?;
        Ok(self.shard(key).set(key, value, ttl, false)?)
    }

    /// Returns the live value for `key`, or `None` if it is absent or
    /// expired. Expired entries are not removed by reads.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] for an empty key.
    pub fn get(&self, key: &str) -> Result<Option<Arc<V>>> {
        validate_key(key)?;
        Ok(self.shard(key).get(key))
    }

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] for an empty key.
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.shard(key).delete(key);
        Ok(())
    }

    /// Sets a new TTL on `key`, counted from the entry's creation.
    ///
    /// Succeeds without change when the key is absent, already expired, or
    /// when the new TTL would already have elapsed.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] for an empty key.
    pub fn renew_ttl(&self, key: &str, ttl: Duration) -> Result<()> {
        validate_key(key)?;
        self.shard(key).renew_ttl(key, ttl);
        Ok(())
    }

    /// Whether `key` holds a live entry. Does not count as a visit.
    ///
    /// # Errors
    ///
    /// [`CacheError::EmptyKey`] for an empty key.
    pub fn contains(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.shard(key).contains(key))
    }

    /// Index of the shard `key` routes to.
    pub fn shard_index(&self, key: &str) -> usize {
        self.selector.shard_for_key(key)
    }

    pub fn shards(&self) -> &[Shard<V>] {
        &self.shards
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total key capacity across all shards.
    pub fn capacity(&self) -> usize {
        self.config.shard_capacity * self.shards.len()
    }

    /// Live keys across all shards. Not a consistent snapshot under
    /// concurrent writes.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn hits(&self) -> u64 {
        self.shards.iter().map(Shard::hits).sum()
    }

    pub fn misses(&self) -> u64 {
        self.shards.iter().map(Shard::misses).sum()
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        let per_shard: Vec<_> = self.shards.iter().map(Shard::metrics).collect();
        CacheMetricsSnapshot::from_shards(&per_shard)
    }

    /// Runs [`Shard::check_invariants`] on every shard.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> std::result::Result<(), InvariantError> {
        self.shards.iter().try_for_each(Shard::check_invariants)
    }
}

impl<V> fmt::Debug for ShardedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shards", &self.shards.len())
            .field("shard_capacity", &self.config.shard_capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CacheBuilder;
    use crate::clock::ManualClock;

    fn cache() -> (ShardedCache<i64>, ManualClock) {
        let clock = ManualClock::new();
        let cache = CacheBuilder::new()
            .clock(clock.clone())
            .try_build()
            .unwrap();
        (cache, clock)
    }

    #[test]
    fn construction_rejects_out_of_range() {
        assert!(ShardedCache::<i64>::new(31, 1024).is_err());
        assert!(ShardedCache::<i64>::new(257, 1024).is_err());
        assert!(ShardedCache::<i64>::new(32, 1023).is_err());
        assert!(ShardedCache::<i64>::new(32, 65537).is_err());
        assert!(ShardedCache::<i64>::new(128, 1024).is_ok());
    }

    #[test]
    fn empty_key_is_rejected_everywhere() {
        let (cache, _) = cache();
        assert_eq!(cache.set("", 1, Duration::ZERO), Err(CacheError::EmptyKey));
        assert_eq!(cache.add("", 1, Duration::ZERO), Err(CacheError::EmptyKey));
        assert_eq!(cache.get(""), Err(CacheError::EmptyKey));
        assert_eq!(cache.delete(""), Err(CacheError::EmptyKey));
        assert_eq!(cache.renew_ttl("", Duration::ZERO), Err(CacheError::EmptyKey));
        assert_eq!(cache.contains(""), Err(CacheError::EmptyKey));
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn operations_route_to_one_shard() {
        let (cache, _) = cache();
        cache.set("abc", 564, Duration::ZERO).unwrap();

        let index = cache.shard_index("abc");
        for (i, shard) in cache.shards().iter().enumerate() {
            assert_eq!(shard.len(), usize::from(i == index));
        }
    }

    #[test]
    fn add_reports_whether_it_stored() {
        let (cache, _) = cache();
        assert!(cache.add("k", 1, Duration::ZERO).unwrap());
        assert!(!cache.add("k", 2, Duration::ZERO).unwrap());
        assert_eq!(cache.get("k").unwrap().as_deref(), Some(&1));
    }

    #[test]
    fn upsert_reports_outcome() {
        let (cache, _) = cache();
        assert_eq!(cache.upsert("k", 1, Duration::ZERO), Ok(SetOutcome::Inserted));
        assert_eq!(cache.upsert("k", 2, Duration::ZERO), Ok(SetOutcome::Updated));
    }

    #[test]
    fn renew_ttl_keeps_entry_alive() {
        let (cache, clock) = cache();
        cache.set("k", 1, Duration::from_secs(10)).unwrap();
        clock.advance(Duration::from_secs(5));
        cache.renew_ttl("k", Duration::from_secs(100)).unwrap();
        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.get("k").unwrap().as_deref(), Some(&1));
    }

    #[test]
    fn metrics_aggregate_all_shards() {
        let (cache, _) = cache();
        for i in 0..100 {
            cache.set(&format!("key-{i}"), i, Duration::ZERO).unwrap();
        }
        for i in 0..100 {
            cache.get(&format!("key-{i}")).unwrap();
            cache.get(&format!("absent-{i}")).unwrap();
        }

        let m = cache.metrics();
        assert_eq!(m.shards, 32);
        assert_eq!(m.totals.len, 100);
        assert_eq!(m.totals.hits, 100);
        assert_eq!(m.totals.misses, 100);
        assert_eq!(cache.hits(), 100);
        assert_eq!(cache.len(), 100);
        assert_eq!(m.totals.capacity, cache.capacity());
        cache.check_invariants().unwrap();
    }
}
