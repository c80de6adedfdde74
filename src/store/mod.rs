//! Shard storage: entries and the bounded per-shard map.
//!
//! Stores own key/value lifecycles and locking; victim choice is delegated
//! to [`crate::policy`].

pub mod entry;
pub mod shard;

pub use entry::Entry;
pub use shard::{SetOutcome, Shard};
