//! Deterministic key-to-shard routing.
//!
//! Keys are hashed with 32-bit MurmurHash2 (seeded with the key length) and
//! reduced modulo the shard count. The hash is only used for routing; the
//! per-shard maps hash keys independently.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                           │
//! │                                                                         │
//! │   Input Key "user:42"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐   │
//! │   │  ShardSelector { shards: 32 }                                 │   │
//! │   │                                                               │   │
//! │   │  1. h = len                                                   │   │
//! │   │  2. fold 4-byte little-endian chunks (m = 0x5bd1e995)         │   │
//! │   │  3. fold 1-3 byte tail, multiply by m                         │   │
//! │   │  4. final avalanche: >>13, *m, >>15                           │   │
//! │   │  5. h % 32                                                    │   │
//! │   └───────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   Shard Index in [0, 32)                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use shardcache::ds::{ShardSelector, murmur_hash2};
//!
//! assert_eq!(murmur_hash2(b"abcd"), 0x2687_3021);
//!
//! let selector = ShardSelector::new(32);
//! let shard = selector.shard_for_key("user:123");
//! assert!(shard < 32);
//! assert_eq!(selector.shard_for_key("user:123"), shard);
//! ```

const M: u32 = 0x5bd1_e995;

/// 32-bit MurmurHash2 with the seed fixed to the input length.
///
/// Bit-compatible with the reference algorithm for seed 0 (`h = 0 ^ len`).
/// Pure and allocation-free.
#[inline]
pub fn murmur_hash2(data: &[u8]) -> u32 {
    let mut h = data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> 24;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, byte) in tail.iter().enumerate() {
            h ^= u32::from(*byte) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Routes string keys to a fixed number of shards.
///
/// The same `(key, shards)` pair always produces the same index, across
/// processes and platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shards: u32,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// # Example
    ///
    /// ```
    /// use shardcache::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(64).shard_count(), 64);
    /// assert_eq!(ShardSelector::new(0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize) -> Self {
        Self {
            shards: u32::try_from(shards.max(1)).unwrap_or(u32::MAX),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards as usize
    }

    /// Maps a key to a shard index in `[0, shards)`.
    #[inline]
    pub fn shard_for_key(&self, key: &str) -> usize {
        (murmur_hash2(key.as_bytes()) % self.shards) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}
