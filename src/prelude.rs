pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::cache::ShardedCache;
pub use crate::clock::{Clock, ManualClock, MonotonicClock};
pub use crate::ds::{EntryPool, ShardSelector, murmur_hash2};
pub use crate::error::{CacheError, ConfigError, InvariantError};
pub use crate::metrics::{CacheMetricsSnapshot, ShardMetricsSnapshot};
pub use crate::policy::{SampledLfu, VictimPolicy};
pub use crate::store::{SetOutcome, Shard};
