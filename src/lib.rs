//! shardcache: a sharded, capacity-bounded in-process cache with TTL expiry
//! and sampled approximate-LFU eviction.
//!
//! Keys route to one of a fixed number of independently locked shards by
//! MurmurHash2. Each shard bounds its live keys, evicts by comparing the
//! visit counters of a small rotating sample, and recycles entries through
//! a per-shard reuse pool.

pub mod builder;
pub mod cache;
pub mod clock;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod store;
