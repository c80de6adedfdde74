//! Advisory counters for observability tooling.
//!
//! Counters are sampled with relaxed atomics and never feed back into cache
//! decisions.

pub mod snapshot;

pub use snapshot::{CacheMetricsSnapshot, ShardMetricsSnapshot};
