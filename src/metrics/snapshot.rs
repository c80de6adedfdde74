use std::ops::AddAssign;

/// Point-in-time view of one shard's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,

    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,

    pub evictions: u64,
    pub expired_evictions: u64, // victims that were already past their ttl

    pub pool_reuses: u64,
    pub pool_allocations: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
    pub pooled: usize,
}

/// Sum of every shard's [`ShardMetricsSnapshot`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub shards: usize,
    pub totals: ShardMetricsSnapshot,
}

impl AddAssign<&ShardMetricsSnapshot> for ShardMetricsSnapshot {
    fn add_assign(&mut self, rhs: &ShardMetricsSnapshot) {
        self.hits += rhs.hits;
        self.misses += rhs.misses;
        self.inserts += rhs.inserts;
        self.updates += rhs.updates;
        self.removes += rhs.removes;
        self.evictions += rhs.evictions;
        self.expired_evictions += rhs.expired_evictions;
        self.pool_reuses += rhs.pool_reuses;
        self.pool_allocations += rhs.pool_allocations;
        self.len += rhs.len;
        self.capacity += rhs.capacity;
        self.pooled += rhs.pooled;
    }
}

impl ShardMetricsSnapshot {
    /// Fraction of lookups that hit, in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheMetricsSnapshot {
    pub fn from_shards<'a>(shards: impl IntoIterator<Item = &'a ShardMetricsSnapshot>) -> Self {
        let mut snapshot = Self::default();
        for shard in shards {
            snapshot.shards += 1;
            snapshot.totals += shard;
        }
        snapshot
    }

    pub fn hit_rate(&self) -> f64 {
        self.totals.hit_rate()
    }
}
