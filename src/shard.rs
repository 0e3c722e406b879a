use crate::entry::{Entry, EntryPool};
use crate::eviction::SampledLru;
use crate::expiry::Clock;
use crate::stats::Metrics;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::hash::Hash;

/// Map and live count, guarded together by the shard lock.
struct ShardState<K, V> {
    map: HashMap<K, Box<Entry<V>>>,
    live: usize,
}

impl<K, V> ShardState<K, V>
where
    K: Hash + Eq,
{
    /// Unlink an entry from the map. The caller hands it to the pool.
    fn detach<Q>(&mut self, key: &Q) -> Option<Box<Entry<V>>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.map.remove(key)?;
        self.live -= 1;
        debug_assert_eq!(self.live, self.map.len());
        Some(entry)
    }

    fn attach(&mut self, key: K, entry: Box<Entry<V>>) {
        self.map.insert(key, entry);
        self.live += 1;
        debug_assert_eq!(self.live, self.map.len());
    }
}

/// Shared collaborators every shard operation needs.
pub(crate) struct ShardContext<'a, V> {
    pub clock: &'a Clock,
    pub pool: &'a EntryPool<V>,
    pub metrics: &'a Metrics,
}

/// A single shard containing a HashMap protected by a read-write lock.
pub(crate) struct Shard<K, V> {
    state: RwLock<ShardState<K, V>>,
}

impl<K, V> Shard<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ShardState {
                map: HashMap::new(),
                live: 0,
            }),
        }
    }

    /// Insert or overwrite a key.
    ///
    /// An existing entry is mutated in place. A new key on a full shard first
    /// evicts one sampled victim. Returns how many entries were sampled when
    /// an eviction happened.
    pub fn set(
        &self,
        key: K,
        value: V,
        deadline: u64,
        capacity: usize,
        policy: &SampledLru,
        ctx: &ShardContext<'_, V>,
    ) -> Option<usize> {
        let mut state = self.state.write();
        let now = ctx.clock.now();

        if let Some(entry) = state.map.get_mut(&key) {
            entry.refresh(value, deadline, now);
            return None;
        }

        let mut evicted = None;
        if capacity > 0 && state.live >= capacity {
            evicted = Self::evict_one(&mut state, policy, ctx);
        }

        let entry = ctx.pool.acquire(value, deadline, now);
        state.attach(key, entry);
        evicted
    }

    /// Remove one approximately-least-recently-used entry.
    ///
    /// An empty sample is a no-op; the following insert then goes one over
    /// capacity. Returns the sample size on eviction.
    fn evict_one(
        state: &mut ShardState<K, V>,
        policy: &SampledLru,
        ctx: &ShardContext<'_, V>,
    ) -> Option<usize> {
        let sampled = policy.sample_len(state.map.len());
        let victim = policy.select_victim(state.map.iter()).cloned()?;
        let entry = state.detach(&victim)?;
        ctx.pool.release(entry);
        ctx.metrics.record_eviction();
        Some(sampled)
    }

    /// Look up a live value, copying it out before the shared lock is released.
    ///
    /// An expired entry is removed under the exclusive lock, after re-checking
    /// that the entry found there is still expired.
    pub fn get<Q>(&self, key: &Q, ctx: &ShardContext<'_, V>) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_with(key, ctx, |_, value| value.clone())
    }

    /// Like [`Shard::get`], also copying out the stored key.
    pub fn get_key_value<Q>(&self, key: &Q, ctx: &ShardContext<'_, V>) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read_with(key, ctx, |key, value| (key.clone(), value.clone()))
    }

    fn read_with<Q, T, F>(&self, key: &Q, ctx: &ShardContext<'_, V>, copy: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> T,
    {
        let state = self.state.read();
        let Some((stored, entry)) = state.map.get_key_value(key) else {
            drop(state);
            ctx.metrics.record_miss();
            return None;
        };

        let now = ctx.clock.now();
        if !entry.is_expired(now) {
            entry.touch(now);
            let copied = entry.value().map(|value| copy(stored, value));
            drop(state);
            match copied {
                Some(_) => ctx.metrics.record_hit(),
                None => ctx.metrics.record_miss(),
            }
            return copied;
        }
        drop(state);

        self.remove_if_expired(key, ctx);
        ctx.metrics.record_miss();
        None
    }

    /// Remove `key` if the entry found under the exclusive lock is expired.
    ///
    /// The caller's earlier observation under the shared lock is only a hint:
    /// another writer may have replaced or removed the entry in between.
    fn remove_if_expired<Q>(&self, key: &Q, ctx: &ShardContext<'_, V>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.write();
        let now = ctx.clock.now();
        let still_expired = state
            .map
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));
        if !still_expired {
            return false;
        }
        match state.detach(key) {
            Some(entry) => {
                ctx.pool.release(entry);
                ctx.metrics.record_expirations(1);
                true
            }
            None => false,
        }
    }

    /// Remove a key. Returns true if it was present.
    pub fn delete<Q>(&self, key: &Q, ctx: &ShardContext<'_, V>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.write();
        match state.detach(key) {
            Some(entry) => {
                ctx.pool.release(entry);
                true
            }
            None => false,
        }
    }

    /// Two-phase sweep: collect expired keys under the shared lock, then
    /// remove the ones still expired under the exclusive lock.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: u64, ctx: &ShardContext<'_, V>) -> usize {
        let candidates = self.expired_keys(now);
        if candidates.is_empty() {
            return 0;
        }
        self.remove_expired(&candidates, now, ctx)
    }

    /// Keys whose deadline is past `now`, collected under the shared lock.
    fn expired_keys(&self, now: u64) -> Vec<K> {
        let state = self.state.read();
        state
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove the candidates that are still expired under the exclusive lock.
    fn remove_expired(&self, candidates: &[K], now: u64, ctx: &ShardContext<'_, V>) -> usize {
        let mut state = self.state.write();
        let mut removed = 0;
        for key in candidates {
            // A concurrent set may have refreshed the deadline since phase one.
            let still_expired = state
                .map
                .get(key)
                .is_some_and(|entry| entry.is_expired(now));
            if !still_expired {
                continue;
            }
            if let Some(entry) = state.detach(key) {
                ctx.pool.release(entry);
                removed += 1;
            }
        }
        removed
    }

    /// Remove every entry, returning them all to the pool.
    pub fn clear(&self, ctx: &ShardContext<'_, V>) -> usize {
        let mut state = self.state.write();
        let removed = state.live;
        for (_, entry) in state.map.drain() {
            ctx.pool.release(entry);
        }
        state.live = 0;
        removed
    }

    /// Live-entry count, read under the shared lock.
    pub fn len(&self) -> usize {
        self.state.read().live
    }
}

impl<K, V> Default for Shard<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
