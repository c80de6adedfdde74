//! A single cache record.
//!
//! An [`Entry`] is owned by exactly one shard at a time: either linked into
//! the shard's map under some key, or idle in the shard's
//! [`EntryPool`](crate::ds::EntryPool). Its value, TTL and creation time are
//! only written while the shard's write lock is held; the visit counter is
//! atomic so readers holding the shared lock can bump it concurrently.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

pub struct Entry<V> {
    value: Option<Arc<V>>,
    visits: AtomicU32,
    ttl: Duration,
    created_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// An unpopulated entry, as handed out by a freshly allocating pool.
    pub fn vacant() -> Self {
        Self {
            value: None,
            visits: AtomicU32::new(0),
            ttl: Duration::ZERO,
            created_at: None,
        }
    }

    /// Repurposes the entry for a new value.
    ///
    /// Clears the visit counter and stamps the creation time with `now`.
    pub fn populate(&mut self, value: V, ttl: Duration, now: Instant) {
        self.reset(now);
        self.value = Some(Arc::new(value));
        self.ttl = ttl;
    }

    fn reset(&mut self, now: Instant) {
        self.value = None;
        *self.visits.get_mut() = 0;
        self.ttl = Duration::ZERO;
        self.created_at = Some(now);
    }

    /// Drops the payload and metadata before the entry goes back to a pool.
    pub fn clear(&mut self) {
        self.value = None;
        *self.visits.get_mut() = 0;
        self.ttl = Duration::ZERO;
        self.created_at = None;
    }

    /// A zero TTL never expires. Otherwise the entry is expired once
    /// `created_at + ttl` is strictly before `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        match self.created_at {
            Some(created) => match created.checked_add(self.ttl) {
                Some(deadline) => deadline < now,
                None => false,
            },
            None => false,
        }
    }

    /// Whether `ttl`, counted from this entry's creation, already lies in the
    /// past at `now`.
    #[inline]
    pub fn would_lapse(&self, ttl: Duration, now: Instant) -> bool {
        match self.created_at {
            Some(created) => created.checked_add(ttl).is_some_and(|deadline| deadline < now),
            None => false,
        }
    }

    /// Records one access.
    #[inline]
    pub fn touch(&self) {
        self.visits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn value(&self) -> Option<&Arc<V>> {
        self.value.as_ref()
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn created_at(&self) -> Option<Instant> {
        self.created_at
    }

    pub fn is_vacant(&self) -> bool {
        self.value.is_none()
    }
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self::vacant()
    }
}

impl<V> fmt::Debug for Entry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("populated", &self.value.is_some())
            .field("visits", &self.visits())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_never_expires() {
        let t0 = Instant::now();
        let mut entry = Entry::vacant();
        entry.populate("v", Duration::ZERO, t0);
        assert!(!entry.is_expired(t0 + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn expiry_is_strict() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);
        let mut entry = Entry::vacant();
        entry.populate(1u32, ttl, t0);

        assert!(!entry.is_expired(t0 + ttl));
        assert!(entry.is_expired(t0 + ttl + Duration::from_nanos(1)));
    }

    #[test]
    fn populate_resets_visits_and_stamps_creation() {
        let t0 = Instant::now();
        let mut entry = Entry::vacant();
        entry.populate(1u32, Duration::ZERO, t0);
        entry.touch();
        entry.touch();
        assert_eq!(entry.visits(), 2);

        let t1 = t0 + Duration::from_secs(3);
        entry.populate(2u32, Duration::from_secs(1), t1);
        assert_eq!(entry.visits(), 0);
        assert_eq!(entry.created_at(), Some(t1));
        assert_eq!(entry.value().map(|v| **v), Some(2));
        assert_eq!(entry.ttl(), Duration::from_secs(1));
    }

    #[test]
    fn clear_drops_payload() {
        let mut entry = Entry::vacant();
        entry.populate(String::from("payload"), Duration::from_secs(1), Instant::now());
        entry.touch();
        entry.clear();

        assert!(entry.is_vacant());
        assert_eq!(entry.visits(), 0);
        assert_eq!(entry.created_at(), None);
    }

    #[test]
    fn would_lapse_measures_from_creation() {
        let t0 = Instant::now();
        let mut entry = Entry::vacant();
        entry.populate((), Duration::from_secs(100), t0);

        let later = t0 + Duration::from_secs(30);
        assert!(entry.would_lapse(Duration::from_secs(10), later));
        assert!(!entry.would_lapse(Duration::from_secs(30), later));
        assert!(!entry.would_lapse(Duration::from_secs(60), later));
    }
}
