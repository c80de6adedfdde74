pub mod entry_pool;
pub mod shard;

pub use entry_pool::EntryPool;
pub use shard::{ShardSelector, murmur_hash2};
