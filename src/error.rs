//! Error types for the shardcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters fall outside
//!   their allowed ranges. No cache is produced.
//! - [`InvariantError`]: Returned when internal shard bookkeeping is found
//!   inconsistent (`check_invariants`, or an eviction pass that cannot find
//!   a live victim).
//! - [`CacheError`]: Per-operation error returned by
//!   [`ShardedCache`](crate::cache::ShardedCache).
//!
//! ## Example Usage
//!
//! ```
//! use shardcache::cache::ShardedCache;
//! use shardcache::error::ConfigError;
//!
//! let bad = ShardedCache::<u64>::new(8, 1024).unwrap_err();
//! assert!(matches!(bad, ConfigError::ShardCount { value: 8, .. }));
//! assert!(bad.to_string().contains("shard count"));
//! ```

use std::fmt;

use thiserror::Error;

/// Result alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`ShardedCache::new`](crate::cache::ShardedCache::new) and
/// [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build).
/// Each variant carries the rejected value and the inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("shard count {value} out of range [{min}, {max}]")]
    ShardCount { value: usize, min: usize, max: usize },

    #[error("per-shard capacity {value} out of range [{min}, {max}]")]
    ShardCapacity { value: usize, min: usize, max: usize },

    #[error("eviction sample size {value} out of range [{min}, {max}]")]
    SampleSize { value: usize, min: usize, max: usize },
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Errors surfaced by cache operations.
///
/// Validation failures are detected before any shard is touched, so an
/// `Err` never coexists with a partial mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The key was the empty string.
    #[error("key can not be empty")]
    EmptyKey,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal bookkeeping failed; the shard was left unchanged.
    #[error("cache invariant violated: {0}")]
    Invariant(#[from] InvariantError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
