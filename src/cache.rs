use crate::config::{create_hasher, Config, RoutingConfig};
use crate::entry::EntryPool;
use crate::error::Error;
use crate::eviction::SampledLru;
use crate::expiry::{self, Clock};
use crate::hash::ShardHasher;
use crate::reaper::Reaper;
use crate::shard::{Shard, ShardContext};
use crate::stats::{Metrics, Stats};
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Everything the reaper thread shares with the cache handle.
struct Inner<K, V> {
    shards: Box<[Shard<K, V>]>,
    hash: ShardHasher,
    routing: RoutingConfig,
    clock: Clock,
    pool: EntryPool<V>,
    metrics: Metrics,
    eviction: SampledLru,
    default_ttl: Duration,
    max_capacity_per_shard: usize,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    #[inline]
    fn ctx(&self) -> ShardContext<'_, V> {
        ShardContext {
            clock: &self.clock,
            pool: &self.pool,
            metrics: &self.metrics,
        }
    }

    /// Figure out which shard this key belongs to.
    #[inline]
    fn shard_index<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        let hash = self.hash.hash_key(key);
        self.routing.route(hash, self.shards.len())
    }

    /// Sweep every shard once. A panic in one shard does not stop the others.
    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ctx = self.ctx();
        let mut removed = 0;
        for (index, shard) in self.shards.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| shard.sweep_expired(now, &ctx))) {
                Ok(count) => removed += count,
                Err(_) => error!(shard = index, "sweep of shard panicked, skipping it"),
            }
        }
        self.metrics.record_expirations(removed as u64);
        removed
    }

    fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }
}

/// Concurrent, TTL-bounded in-process cache.
///
/// Keys are spread across independently locked shards, so operations on
/// different shards never block each other. Reads copy the value out
/// (`V: Clone`); wrap large values in `Arc` to keep that cheap.
///
/// A background thread removes expired entries every `cleanup_interval`.
/// [`Cache::close`] (or dropping the cache) stops and joins it. A closed
/// cache keeps working; expired entries are then only removed when read or
/// by [`Cache::purge_expired`].
///
/// # Example
///
/// ```rust
/// use shardcache::Cache;
/// use std::time::Duration;
///
/// let cache = Cache::new(Duration::from_secs(300))?;
/// cache.set("session:abc".to_string(), "active");
/// cache.set_with_ttl("otp:42".to_string(), "1234", Some(Duration::from_secs(30)));
///
/// assert_eq!(cache.get("session:abc"), Some("active"));
/// cache.close();
/// # Ok::<(), shardcache::Error>(())
/// ```
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
    reaper: Mutex<Option<Reaper>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the given default TTL and otherwise default config.
    pub fn new(default_ttl: Duration) -> Result<Self, Error> {
        Self::with_config(Config::default().default_ttl(default_ttl))
    }

    /// Create a cache whose shards each hold at most `max_capacity_per_shard`
    /// entries (0 = unbounded).
    pub fn with_capacity(
        default_ttl: Duration,
        max_capacity_per_shard: usize,
    ) -> Result<Self, Error> {
        Self::with_config(
            Config::default()
                .default_ttl(default_ttl)
                .max_capacity_per_shard(max_capacity_per_shard),
        )
    }

    /// Create a cache with custom config and start its reaper.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        config.validate()?;

        let shards: Box<[Shard<K, V>]> =
            (0..config.shard_count).map(|_| Shard::new()).collect();
        let inner = Arc::new(Inner {
            shards,
            hash: create_hasher(config.hash_function),
            routing: config.routing,
            clock: Clock::new(),
            pool: EntryPool::new(config.entry_pool_limit),
            metrics: Metrics::new(),
            eviction: SampledLru::new(config.eviction_samples),
            default_ttl: config.default_ttl,
            max_capacity_per_shard: config.max_capacity_per_shard,
        });

        let sweeper = Arc::clone(&inner);
        let reaper = Reaper::spawn(config.cleanup_interval, config.shard_count, move || {
            sweeper.purge_expired()
        })?;

        Ok(Self {
            inner,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    #[inline]
    fn shard<Q: Hash + ?Sized>(&self, key: &Q) -> &Shard<K, V> {
        &self.inner.shards[self.inner.shard_index(key)]
    }

    /// Insert or overwrite a key using the default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, None);
    }

    /// Insert or overwrite a key. `None` or a zero TTL uses the default TTL.
    ///
    /// Inserting a new key into a full shard evicts one approximately
    /// least-recently-used entry from that shard first. Overwriting an
    /// existing key never evicts.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Option<Duration>) {
        let inner = &*self.inner;
        let ttl = expiry::effective_ttl(ttl, inner.default_ttl);
        let deadline = inner.clock.deadline(inner.clock.now(), ttl);
        let index = inner.shard_index(&key);

        let evicted = inner.shards[index].set(
            key,
            value,
            deadline,
            inner.max_capacity_per_shard,
            &inner.eviction,
            &inner.ctx(),
        );
        if let Some(sampled) = evicted {
            trace!(shard = index, sampled, "evicted entry to stay within shard capacity");
        }
    }

    /// Get a copy of a live value. Missing and expired keys return `None`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).get(key, &self.inner.ctx())
    }

    /// Remove a key. Returns true if it was present; removing a missing key
    /// is a no-op.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).delete(key, &self.inner.ctx())
    }

    /// Set every pair independently, all with the same TTL override.
    ///
    /// There is no atomicity across keys: concurrent readers may observe a
    /// partially applied batch.
    pub fn set_multi<I>(&self, entries: I, ttl: Option<Duration>)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set_with_ttl(key, value, ttl);
        }
    }

    /// Get every live key among `keys`. Missing and expired keys are omitted.
    ///
    /// Keys may be given in any borrowed form, so a `String`-keyed cache can
    /// be queried with `&str`s. The returned map holds the stored keys.
    pub fn get_multi<'a, Q, I>(&self, keys: I) -> HashMap<K, V>
    where
        I: IntoIterator<Item = &'a Q>,
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
    {
        let keys = keys.into_iter();
        let mut found = HashMap::with_capacity(keys.size_hint().0);
        let ctx = self.inner.ctx();
        for key in keys {
            if let Some((stored, value)) = self.shard(key).get_key_value(key, &ctx) {
                found.insert(stored, value);
            }
        }
        found
    }

    /// Remove every entry, one shard at a time.
    ///
    /// Not atomic across shards: a concurrent reader may see some shards
    /// already cleared and others not yet.
    pub fn clear(&self) {
        let ctx = self.inner.ctx();
        let removed: usize = self.inner.shards.iter().map(|shard| shard.clear(&ctx)).sum();
        debug!(removed, "cache cleared");
    }

    /// Run one reaper pass now, returning the number of expired entries removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Total live entries. Each shard is read under its own lock, so the sum
    /// is approximate while other threads are writing.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Alias for [`Cache::size`].
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.shards.iter().all(|shard| shard.len() == 0)
    }

    /// Live entries in each shard, in shard order.
    pub fn shard_loads(&self) -> Vec<usize> {
        self.inner.shards.iter().map(|shard| shard.len()).collect()
    }

    /// Number of shards, fixed at construction.
    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    /// Counters plus current size. Fields are loaded one by one, not as a
    /// consistent snapshot.
    pub fn stats(&self) -> Stats {
        self.inner.metrics.snapshot(self.inner.size())
    }

    /// Hit rate as a percentage; 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }
}

impl<K, V> Cache<K, V> {
    /// Stop the reaper and wait for it to exit.
    ///
    /// Calling this more than once is a no-op.
    pub fn close(&self) {
        let reaper = self.reaper.lock().take();
        match reaper {
            Some(reaper) => reaper.stop(),
            None => debug!("cache already closed"),
        }
    }

    /// Check whether [`Cache::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.reaper.lock().is_none()
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.stop();
        }
    }
}
