//! Per-shard free list of reusable [`Entry`] boxes.
//!
//! Deleted and evicted entries are cleared and parked here instead of being
//! dropped, so steady-state churn reuses allocations.
//!
//! ```text
//!   acquire() ──► pop idle box ──► (empty?) ──► Box::new(Entry::vacant())
//!
//!   release(box) ──► entry.clear() ──► push idle box
//! ```
//!
//! The pool does not know about shard maps. Callers must unlink an entry
//! from every lookup structure before releasing it; a released box may be
//! handed to the very next `acquire`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::store::entry::Entry;

#[derive(Debug)]
pub struct EntryPool<V> {
    idle: Mutex<Vec<Box<Entry<V>>>>,
    reused: AtomicU64,
    allocated: AtomicU64,
}

impl<V> EntryPool<V> {
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
        }
    }

    /// Returns a previously released entry, or allocates a vacant one.
    ///
    /// No ordering guarantee on which idle entry is returned.
    pub fn acquire(&self) -> Box<Entry<V>> {
        match self.idle.lock().pop() {
            Some(entry) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                entry
            },
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Box::new(Entry::vacant())
            },
        }
    }

    /// Clears `entry` and parks it for reuse.
    pub fn release(&self, mut entry: Box<Entry<V>>) {
        entry.clear();
        self.idle.lock().push(entry);
    }

    /// Number of entries currently parked.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of `acquire` calls served from the free list.
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Number of `acquire` calls that had to allocate.
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }
}

impl<V> Default for EntryPool<V> {
    fn default() -> Self {
        Self::new()
    }
}
