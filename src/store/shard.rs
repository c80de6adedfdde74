//! One independently locked partition of the cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                               Shard<V>                                      │
//! │                                                                             │
//! │   RwLock<ShardInner>                                                        │
//! │   ┌─────────────────────────────────────────────────────────────────────┐   │
//! │   │  map: FxHashMap<Arc<str>, Slot>        keys: Vec<Arc<str>>          │   │
//! │   │       key → (position, Box<Entry>)          dense key index         │   │
//! │   │                                                                     │   │
//! │   │  length (logical live count, <= capacity)                           │   │
//! │   │  policy: SampledLfu { sample: [k1, k7, k3] }                        │   │
//! │   └─────────────────────────────────────────────────────────────────────┘   │
//! │                                                                             │
//! │   pool: EntryPool<V>       idle Box<Entry> for reuse                        │
//! │   counters: ShardCounters  hits/misses/... (atomics, advisory)              │
//! └─────────────────────────────────────────────────────────────────────────────┘
//!
//! Lock usage
//! ──────────
//!
//!   get                             read lock; visit counter bumped atomically
//!   set / add / delete / renew_ttl  write lock for the whole operation
//!
//! Insert of a new key
//! ───────────────────
//!
//!   length < capacity  → entry from pool (or fresh), length += 1
//!   length >= capacity → policy picks victim, victim unlinked, its entry reused
//! ```
//!
//! The dense `keys` vector gives the eviction policy O(1) uniform sampling;
//! removals use swap-remove and patch the moved key's position.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::clock::Clock;
use crate::ds::EntryPool;
use crate::error::InvariantError;
use crate::metrics::ShardMetricsSnapshot;
use crate::policy::{Candidate, SampleSource, SampledLfu, VictimPolicy};
use crate::store::entry::Entry;

/// Outcome of [`Shard::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// A new key was linked into a free slot.
    Inserted,
    /// A new key took over an evicted victim's entry.
    Replaced,
    /// An existing key's entry was repopulated.
    Updated,
    /// `insert_only` was set and a live entry already holds the key.
    Present,
}

impl SetOutcome {
    /// Whether the value was stored.
    pub fn stored(self) -> bool {
        !matches!(self, SetOutcome::Present)
    }
}

/// Counters using relaxed atomics; readable without the shard lock.
#[derive(Debug, Default)]
struct ShardCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
    expired_evictions: AtomicU64,
}

impl ShardCounters {
    #[inline]
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct Slot<V> {
    position: usize,
    entry: Box<Entry<V>>,
}

struct ShardInner<V> {
    map: FxHashMap<Arc<str>, Slot<V>>,
    keys: Vec<Arc<str>>,
    length: usize,
    policy: SampledLfu,
}

impl<V> ShardInner<V> {
    fn link(&mut self, key: Arc<str>, entry: Box<Entry<V>>) {
        let position = self.keys.len();
        self.keys.push(Arc::clone(&key));
        self.map.insert(key, Slot { position, entry });
    }

    /// Removes `key` from the map and the dense index. Leaves `length` alone.
    fn unlink(&mut self, key: &str) -> Option<Box<Entry<V>>> {
        let slot = self.map.remove(key)?;
        let last = self.keys.len() - 1;
        if slot.position != last {
            self.keys.swap(slot.position, last);
            if let Some(moved) = self.map.get_mut(&self.keys[slot.position]) {
                moved.position = slot.position;
            }
        }
        self.keys.pop();
        Some(slot.entry)
    }
}

/// Borrowed view handed to the eviction policy.
struct LiveKeys<'a, V> {
    map: &'a FxHashMap<Arc<str>, Slot<V>>,
    keys: &'a [Arc<str>],
}

impl<V> SampleSource for LiveKeys<'_, V> {
    fn live_len(&self) -> usize {
        self.keys.len()
    }

    fn key_at(&self, index: usize) -> Option<&Arc<str>> {
        self.keys.get(index)
    }

    fn probe(&self, key: &str, now: Instant) -> Option<Candidate> {
        self.map.get(key).map(|slot| Candidate {
            visits: slot.entry.visits(),
            expired: slot.entry.is_expired(now),
        })
    }
}

/// Capacity-bounded map guarded by one reader-writer lock.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use shardcache::clock::MonotonicClock;
/// use shardcache::store::Shard;
///
/// let shard: Shard<&str> = Shard::new(0, 1024, 3, 0, Arc::new(MonotonicClock));
/// shard.set("k", "v", Duration::ZERO, false).unwrap();
/// assert_eq!(shard.get("k").as_deref(), Some(&"v"));
/// assert_eq!(shard.len(), 1);
/// ```
pub struct Shard<V> {
    index: usize,
    capacity: usize,
    inner: RwLock<ShardInner<V>>,
    pool: EntryPool<V>,
    counters: ShardCounters,
    clock: Arc<dyn Clock>,
}

impl<V> Shard<V> {
    /// Creates an empty shard.
    ///
    /// `index` only labels log events. `seed` drives eviction sampling.
    pub fn new(
        index: usize,
        capacity: usize,
        sample_size: usize,
        seed: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            capacity,
            inner: RwLock::new(ShardInner {
                map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
                keys: Vec::with_capacity(capacity),
                length: 0,
                policy: SampledLfu::new(sample_size, seed),
            }),
            pool: EntryPool::new(),
            counters: ShardCounters::default(),
            clock,
        }
    }

    /// Stores `value` under `key`.
    ///
    /// With `insert_only`, an existing live entry is left untouched and
    /// [`SetOutcome::Present`] is returned; an expired one is overwritten.
    /// A new key on a full shard evicts a victim chosen by sampled LFU.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError`] if eviction could not find a victim. The
    /// shard is unchanged in that case.
    pub fn set(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
        insert_only: bool,
    ) -> Result<SetOutcome, InvariantError> {
        let now = self.clock.now();
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if let Some(slot) = inner.map.get_mut(key) {
            if insert_only && !slot.entry.is_expired(now) {
                return Ok(SetOutcome::Present);
            }
            slot.entry.populate(value, ttl, now);
            ShardCounters::inc(&self.counters.updates);
            return Ok(SetOutcome::Updated);
        }

        let (mut entry, outcome) = if inner.length >= self.capacity {
            let view = LiveKeys {
                map: &inner.map,
                keys: &inner.keys,
            };
            let victim = inner.policy.select_victim(&view, now)?;
            let entry = inner.unlink(&victim).ok_or_else(|| {
                InvariantError::new(format!("eviction victim {victim:?} missing from map"))
            })?;
            let expired = entry.is_expired(now);
            tracing::trace!(shard = self.index, victim = &*victim, expired, "evicted");
            ShardCounters::inc(&self.counters.evictions);
            if expired {
                ShardCounters::inc(&self.counters.expired_evictions);
            }
            (entry, SetOutcome::Replaced)
        } else {
            inner.length += 1;
            (self.pool.acquire(), SetOutcome::Inserted)
        };

        entry.populate(value, ttl, now);
        inner.link(Arc::from(key), entry);
        ShardCounters::inc(&self.counters.inserts);
        Ok(outcome)
    }

    /// Returns the live value for `key`.
    ///
    /// Expired entries read as absent but stay in place until overwritten,
    /// deleted or evicted.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = self.clock.now();
        let inner = self.inner.read();
        let value = inner
            .map
            .get(key)
            .filter(|slot| !slot.entry.is_expired(now))
            .and_then(|slot| {
                slot.entry.touch();
                slot.entry.value().cloned()
            });
        drop(inner);

        match value {
            Some(value) => {
                ShardCounters::inc(&self.counters.hits);
                Some(value)
            },
            None => {
                ShardCounters::inc(&self.counters.misses);
                None
            },
        }
    }

    /// Whether `key` holds a live entry. Touches no counters.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.inner
            .read()
            .map
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired(now))
    }

    /// Removes `key` and parks its entry in the reuse pool.
    ///
    /// Returns whether a key was removed; absent keys are a no-op.
    pub fn delete(&self, key: &str) -> bool {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let Some(entry) = inner.unlink(key) else {
            return false;
        };
        inner.policy.forget(key);
        inner.length -= 1;
        drop(guard);

        // unlinked above; no lookup can reach it any more
        self.pool.release(entry);
        ShardCounters::inc(&self.counters.removes);
        true
    }

    /// Replaces the TTL of a live entry and counts it as a visit.
    ///
    /// Declines (returns `false`, changes nothing) when the key is absent,
    /// already expired, or when `ttl` measured from the entry's original
    /// creation time already lies in the past.
    pub fn renew_ttl(&self, key: &str, ttl: Duration) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.write();

        let Some(slot) = inner.map.get_mut(key) else {
            return false;
        };
        if slot.entry.is_expired(now) || slot.entry.would_lapse(ttl, now) {
            return false;
        }
        slot.entry.set_ttl(ttl);
        slot.entry.touch();
        true
    }

    /// Visit count of `key`'s entry, expired or not.
    pub fn visits(&self, key: &str) -> Option<u32> {
        self.inner.read().map.get(key).map(|slot| slot.entry.visits())
    }

    /// Logical number of live keys (expired entries included).
    pub fn len(&self) -> usize {
        self.inner.read().length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hits(&self) -> u64 {
        self.counters.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.counters.misses.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> ShardMetricsSnapshot {
        let c = &self.counters;
        ShardMetricsSnapshot {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            inserts: c.inserts.load(Ordering::Relaxed),
            updates: c.updates.load(Ordering::Relaxed),
            removes: c.removes.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            expired_evictions: c.expired_evictions.load(Ordering::Relaxed),
            pool_reuses: self.pool.reused(),
            pool_allocations: self.pool.allocated(),
            len: self.len(),
            capacity: self.capacity,
            pooled: self.pool.idle(),
        }
    }

    /// Scans the shard for bookkeeping inconsistencies.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let inner = self.inner.read();
        let fail = |msg: String| Err(InvariantError::new(format!("shard {}: {msg}", self.index)));

        if inner.length > self.capacity {
            return fail(format!(
                "length {} exceeds capacity {}",
                inner.length, self.capacity
            ));
        }
        if inner.length != inner.map.len() {
            return fail(format!(
                "length {} != map size {}",
                inner.length,
                inner.map.len()
            ));
        }
        if inner.keys.len() != inner.map.len() {
            return fail(format!(
                "key index size {} != map size {}",
                inner.keys.len(),
                inner.map.len()
            ));
        }
        for (position, key) in inner.keys.iter().enumerate() {
            match inner.map.get(key) {
                Some(slot) if slot.position == position => {
                    if slot.entry.is_vacant() {
                        return fail(format!("key {key:?} maps to a vacant entry"));
                    }
                },
                Some(slot) => {
                    return fail(format!(
                        "key {key:?} at position {position} but slot records {}",
                        slot.position
                    ));
                },
                None => return fail(format!("indexed key {key:?} missing from map")),
            }
        }
        if inner.policy.sampled().len() > inner.policy.sample_size() {
            return fail(format!(
                "sample holds {} keys, limit {}",
                inner.policy.sampled().len(),
                inner.policy.sample_size()
            ));
        }
        Ok(())
    }
}

impl<V> fmt::Debug for Shard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.index)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
