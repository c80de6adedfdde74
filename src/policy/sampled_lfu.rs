//! Sampled approximate-LFU victim selection.
//!
//! Instead of keeping every key ordered by frequency, the policy keeps a
//! tiny sample of candidate keys between evictions and picks the least
//! visited one when the shard is full.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     select_victim(source, now)                          │
//! │                                                                         │
//! │   round 1..=MAX_RESAMPLE_ROUNDS:                                        │
//! │                                                                         │
//! │   1. refill   sample: [k3, k9]  ── random dense index ──►  [k3, k9, k1] │
//! │                                                                         │
//! │   2. scan     k3: gone from map        → pruned                         │
//! │               k9: visits 4             → best so far                    │
//! │               k1: visits 2             → best                           │
//! │               (any expired candidate   → returned immediately)          │
//! │                                                                         │
//! │   3. winner removed from sample, returned                               │
//! │      no live candidate → next round                                     │
//! │                                                                         │
//! │   rounds exhausted → InvariantError                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Candidate keys may go stale between calls (deleted, or evicted through a
//! different path); they are pruned lazily when scanned. Eviction cost is
//! O(sample size) per round.
//!
//! Sampling uses an inline XorShift64 generator so runs are reproducible
//! from the configured seed.

use std::sync::Arc;
use std::time::Instant;

use crate::error::InvariantError;
use crate::policy::{SampleSource, VictimPolicy};

/// Candidates kept in the sample between evictions.
pub const DEFAULT_SAMPLE_SIZE: usize = 3;

/// Refill-and-scan rounds attempted before giving up.
pub const MAX_RESAMPLE_ROUNDS: usize = 64;

/// Random draws per missing sample slot during a refill.
const DRAWS_PER_SLOT: usize = 4;

#[derive(Debug)]
pub struct SampledLfu {
    sample_size: usize,
    sample: Vec<Arc<str>>,
    rng_state: u64,
}

impl SampledLfu {
    /// Creates a policy keeping `sample_size` candidates (at least 1).
    pub fn new(sample_size: usize, seed: u64) -> Self {
        let sample_size = sample_size.max(1);
        Self {
            sample_size,
            sample: Vec::with_capacity(sample_size),
            // XorShift must not start at zero
            rng_state: seed ^ 0x9e37_79b9_7f4a_7c15,
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Keys currently held as candidates.
    pub fn sampled(&self) -> &[Arc<str>] {
        &self.sample
    }

    #[inline]
    fn next_random(&mut self) -> u64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        x
    }

    fn holds(&self, key: &str) -> bool {
        self.sample.iter().any(|k| &**k == key)
    }

    /// Tops the sample up to `sample_size` with live keys not already in it.
    fn refill<S: SampleSource>(&mut self, source: &S) {
        let live = source.live_len();
        if live == 0 {
            return;
        }

        if live <= self.sample_size {
            for index in 0..live {
                if self.sample.len() >= self.sample_size {
                    break;
                }
                if let Some(key) = source.key_at(index) {
                    if !self.holds(key) {
                        self.sample.push(Arc::clone(key));
                    }
                }
            }
            return;
        }

        let missing = self.sample_size.saturating_sub(self.sample.len());
        let mut draws = missing * DRAWS_PER_SLOT;
        while self.sample.len() < self.sample_size && draws > 0 {
            draws -= 1;
            let index = (self.next_random() % live as u64) as usize;
            if let Some(key) = source.key_at(index) {
                if !self.holds(key) {
                    self.sample.push(Arc::clone(key));
                }
            }
        }
    }

    /// One scan over the sample. Prunes stale keys; returns the winner's
    /// position if any live candidate was seen.
    fn scan<S: SampleSource>(&mut self, source: &S, now: Instant) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        let mut i = 0;
        while i < self.sample.len() {
            let Some(candidate) = source.probe(&self.sample[i], now) else {
                self.sample.remove(i);
                continue;
            };
            if candidate.expired {
                return Some(i);
            }
            match best {
                Some((_, visits)) if candidate.visits >= visits => {},
                _ => best = Some((i, candidate.visits)),
            }
            i += 1;
        }
        best.map(|(i, _)| i)
    }
}

impl Default for SampledLfu {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE, 0)
    }
}

impl VictimPolicy for SampledLfu {
    fn select_victim<S: SampleSource>(
        &mut self,
        source: &S,
        now: Instant,
    ) -> Result<Arc<str>, InvariantError> {
        for _ in 0..MAX_RESAMPLE_ROUNDS {
            self.refill(source);
            if let Some(winner) = self.scan(source, now) {
                return Ok(self.sample.remove(winner));
            }
        }

        tracing::warn!(
            live = source.live_len(),
            rounds = MAX_RESAMPLE_ROUNDS,
            "eviction sampling found no live candidate"
        );
        Err(InvariantError::new(format!(
            "no live eviction candidate after {MAX_RESAMPLE_ROUNDS} sampling rounds ({} live keys)",
            source.live_len()
        )))
    }

    fn forget(&mut self, key: &str) {
        self.sample.retain(|k| &**k != key);
    }
}
