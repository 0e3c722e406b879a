use crate::expiry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A recyclable record holding a value, its deadline and its last access time.
///
/// `expiration` and `last_access` are atomics so readers holding only the
/// shard's shared lock can check expiry and stamp recency.
pub(crate) struct Entry<V> {
    value: Option<V>,
    expiration: AtomicU64,
    last_access: AtomicU64,
}

impl<V> Entry<V> {
    fn empty() -> Self {
        Self {
            value: None,
            expiration: AtomicU64::new(expiry::NO_EXPIRY),
            last_access: AtomicU64::new(0),
        }
    }

    /// Overwrite the entry in place. Requires exclusive access.
    pub fn refresh(&mut self, value: V, deadline: u64, now: u64) {
        self.value = Some(value);
        self.expiration.store(deadline, Ordering::Release);
        self.last_access.store(now, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    #[inline]
    pub fn deadline(&self) -> u64 {
        self.expiration.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        expiry::is_expired(self.deadline(), now)
    }

    #[inline]
    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    /// Record a read. Safe under a shared lock.
    #[inline]
    pub fn touch(&self, now: u64) {
        self.last_access.store(now, Ordering::Relaxed);
    }
}

/// Shared free list of entries.
///
/// Entries only ever reach [`EntryPool::release`] by being moved out of a
/// shard's map, so a pooled entry has no other owner and no reader can still
/// reach it.
pub(crate) struct EntryPool<V> {
    free: Mutex<Vec<Box<Entry<V>>>>,
    limit: usize,
}

impl<V> EntryPool<V> {
    pub fn new(limit: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            limit,
        }
    }

    /// Hand out a populated entry, reusing a free one when available.
    pub fn acquire(&self, value: V, deadline: u64, now: u64) -> Box<Entry<V>> {
        let recycled = if self.limit > 0 {
            self.free.lock().pop()
        } else {
            None
        };
        let mut entry = recycled.unwrap_or_else(|| Box::new(Entry::empty()));
        entry.refresh(value, deadline, now);
        entry
    }

    /// Take back an entry that was just removed from a shard.
    ///
    /// The payload is dropped here; retained entries carry no value.
    pub fn release(&self, mut entry: Box<Entry<V>>) {
        drop(entry.value.take());
        if self.limit == 0 {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.limit {
            free.push(entry);
        }
    }

    /// Number of free entries currently retained.
    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_release_then_acquire_reuses_allocation() {
        let pool = EntryPool::new(4);
        let entry = pool.acquire("a", 10, 1);
        let addr = &*entry as *const Entry<&str>;
        pool.release(entry);
        assert_eq!(pool.available(), 1);

        let entry = pool.acquire("b", 20, 2);
        assert_eq!(&*entry as *const Entry<&str>, addr);
        assert_eq!(entry.value(), Some(&"b"));
        assert_eq!(entry.deadline(), 20);
        assert_eq!(entry.last_access(), 2);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_drops_payload() {
        let pool = EntryPool::new(4);
        let payload = Arc::new(7);
        let entry = pool.acquire(Arc::clone(&payload), 0, 0);
        assert_eq!(Arc::strong_count(&payload), 2);
        pool.release(entry);
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = EntryPool::new(2);
        let entries: Vec<_> = (0..5).map(|i| pool.acquire(i, 0, 0)).collect();
        for entry in entries {
            pool.release(entry);
        }
        assert_eq!(pool.available(), 2);

        let disabled = EntryPool::new(0);
        disabled.release(disabled.acquire(1, 0, 0));
        assert_eq!(disabled.available(), 0);
    }
}
