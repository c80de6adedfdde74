//! Eviction victim selection.
//!
//! A shard at capacity asks its [`VictimPolicy`] for a key to give up. The
//! policy reads the shard's live keys through a [`SampleSource`] view and
//! never mutates the map itself; the shard unlinks the returned key.

use std::sync::Arc;
use std::time::Instant;

use crate::error::InvariantError;

pub mod sampled_lfu;

pub use sampled_lfu::{DEFAULT_SAMPLE_SIZE, MAX_RESAMPLE_ROUNDS, SampledLfu};

/// What a policy may learn about one live key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub visits: u32,
    pub expired: bool,
}

/// Read-only view of a shard's live keys.
pub trait SampleSource {
    /// Number of live keys.
    fn live_len(&self) -> usize;

    /// Key at a dense position in `[0, live_len())`.
    fn key_at(&self, index: usize) -> Option<&Arc<str>>;

    /// Looks `key` up in the live map. `None` means the key is gone.
    fn probe(&self, key: &str, now: Instant) -> Option<Candidate>;
}

/// Chooses eviction victims for a full shard.
pub trait VictimPolicy {
    /// Picks a live key to evict.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError`] if no live victim could be found.
    fn select_victim<S: SampleSource>(
        &mut self,
        source: &S,
        now: Instant,
    ) -> Result<Arc<str>, InvariantError>;

    /// Drops any candidate state held for `key`.
    fn forget(&mut self, key: &str);
}
