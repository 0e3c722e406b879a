use crate::error::Error;
use crate::hash::ShardHasher;
use std::time::Duration;

/// Default time-to-live applied when `set` is called without an override.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
/// Default number of shards.
pub const DEFAULT_SHARD_COUNT: usize = 256;
/// Default period between background reaper passes.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
/// Default number of entries sampled when picking an eviction victim.
pub const DEFAULT_EVICTION_SAMPLES: usize = 5;
/// Default number of free entries the allocator keeps for reuse.
pub const DEFAULT_ENTRY_POOL_LIMIT: usize = 1024;

/// Which hash function to use for shard assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// User-provided shard selection. Enables stateful or custom routing.
///
/// Routers must be pure: the same hash must always map to the same shard,
/// otherwise per-shard locking no longer serializes operations on a key.
pub trait ShardRouter: Send + Sync {
    /// Return the shard index in `[0, shard_count)` for the given key hash.
    fn route(&self, key_hash: u64, shard_count: usize) -> usize;
}

/// Default routing: a mask for power-of-two shard counts, modulo otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouter;

impl ShardRouter for DefaultRouter {
    #[inline]
    fn route(&self, key_hash: u64, shard_count: usize) -> usize {
        if shard_count.is_power_of_two() {
            (key_hash as usize) & (shard_count - 1)
        } else {
            (key_hash % shard_count as u64) as usize
        }
    }
}

/// Routing strategy for shard selection.
#[derive(Default)]
pub enum RoutingConfig {
    /// Default: see [`DefaultRouter`].
    #[default]
    Default,
    /// User-provided router (e.g. stateful or custom distribution).
    Custom(Box<dyn ShardRouter>),
}

impl RoutingConfig {
    /// Resolve a key hash to a shard index, always in `[0, shard_count)`.
    #[inline]
    pub(crate) fn route(&self, key_hash: u64, shard_count: usize) -> usize {
        match self {
            RoutingConfig::Default => DefaultRouter.route(key_hash, shard_count),
            RoutingConfig::Custom(router) => router.route(key_hash, shard_count) % shard_count,
        }
    }
}

impl std::fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingConfig::Default => write!(f, "RoutingConfig::Default"),
            RoutingConfig::Custom(_) => write!(f, "RoutingConfig::Custom(...)"),
        }
    }
}

/// Configuration for a Cache instance.
#[derive(Debug)]
pub struct Config {
    pub(crate) default_ttl: Duration,
    pub(crate) max_capacity_per_shard: usize,
    pub(crate) shard_count: usize,
    pub(crate) cleanup_interval: Duration,
    pub(crate) hash_function: HashFunction,
    pub(crate) routing: RoutingConfig,
    pub(crate) eviction_samples: usize,
    pub(crate) entry_pool_limit: usize,
}

impl Config {
    /// Create a new config with defaults (5 minute TTL, unbounded shards,
    /// 256 shards, one reaper pass per minute, ahash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL used when `set` is called without an override.
    /// `Duration::ZERO` makes such entries never expire.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Bound the number of live entries per shard. 0 disables eviction.
    pub fn max_capacity_per_shard(mut self, capacity: usize) -> Self {
        self.max_capacity_per_shard = capacity;
        self
    }

    /// Set the number of shards. Must be greater than 0.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::InvalidShardCount);
        }
        self.shard_count = count;
        Ok(self)
    }

    /// Set the period between background reaper passes. Must be non-zero.
    pub fn cleanup_interval(mut self, interval: Duration) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::InvalidCleanupInterval);
        }
        self.cleanup_interval = interval;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set how many entries are sampled when choosing an eviction victim.
    pub fn eviction_samples(mut self, samples: usize) -> Result<Self, Error> {
        if samples == 0 {
            return Err(Error::InvalidSampleSize);
        }
        self.eviction_samples = samples;
        Ok(self)
    }

    /// Set how many released entries are kept for reuse. 0 disables recycling.
    pub fn entry_pool_limit(mut self, limit: usize) -> Self {
        self.entry_pool_limit = limit;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.shard_count == 0 {
            return Err(Error::InvalidShardCount);
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::InvalidCleanupInterval);
        }
        if self.eviction_samples == 0 {
            return Err(Error::InvalidSampleSize);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_capacity_per_shard: 0,
            shard_count: DEFAULT_SHARD_COUNT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            hash_function: HashFunction::AHash,
            routing: RoutingConfig::Default,
            eviction_samples: DEFAULT_EVICTION_SAMPLES,
            entry_pool_limit: DEFAULT_ENTRY_POOL_LIMIT,
        }
    }
}

/// Builder for creating a Cache with custom configuration.
///
/// ```rust
/// use shardcache::CacheBuilder;
/// use std::time::Duration;
///
/// let cache = CacheBuilder::new()
///     .default_ttl(Duration::from_secs(30))
///     .max_capacity_per_shard(1_000)
///     .shard_count(64)?
///     .build::<String, u64>()?;
/// # Ok::<(), shardcache::Error>(())
/// ```
pub struct CacheBuilder {
    config: Config,
}

impl CacheBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the TTL used when `set` is called without an override.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.default_ttl(ttl);
        self
    }

    /// Bound the number of live entries per shard. 0 disables eviction.
    pub fn max_capacity_per_shard(mut self, capacity: usize) -> Self {
        self.config = self.config.max_capacity_per_shard(capacity);
        self
    }

    /// Set the number of shards. Must be greater than 0.
    pub fn shard_count(mut self, count: usize) -> Result<Self, Error> {
        self.config = self.config.shard_count(count)?;
        Ok(self)
    }

    /// Set the period between background reaper passes. Must be non-zero.
    pub fn cleanup_interval(mut self, interval: Duration) -> Result<Self, Error> {
        self.config = self.config.cleanup_interval(interval)?;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Use a custom shard router (e.g. for stateful or custom distribution).
    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.config.routing = routing;
        self
    }

    /// Set how many entries are sampled when choosing an eviction victim.
    pub fn eviction_samples(mut self, samples: usize) -> Result<Self, Error> {
        self.config = self.config.eviction_samples(samples)?;
        Ok(self)
    }

    /// Set how many released entries are kept for reuse.
    pub fn entry_pool_limit(mut self, limit: usize) -> Self {
        self.config = self.config.entry_pool_limit(limit);
        self
    }

    /// Build a Cache with the configured settings and start its reaper.
    pub fn build<K, V>(self) -> Result<crate::Cache<K, V>, Error>
    where
        K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        crate::Cache::with_config(self.config)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> ShardHasher {
    match hash_fn {
        HashFunction::AHash => ShardHasher::AHash,
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => ShardHasher::FxHash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_router_stays_in_range() {
        for shards in [1, 3, 7, 16, 256] {
            for hash in [0u64, 1, 12345, u64::MAX] {
                assert!(DefaultRouter.route(hash, shards) < shards);
            }
        }
    }

    #[test]
    fn test_custom_router_is_clamped() {
        struct Wild;
        impl ShardRouter for Wild {
            fn route(&self, _key_hash: u64, _shard_count: usize) -> usize {
                usize::MAX
            }
        }

        let routing = RoutingConfig::Custom(Box::new(Wild));
        assert!(routing.route(42, 10) < 10);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::new().shard_count(0),
            Err(Error::InvalidShardCount)
        ));
        assert!(matches!(
            Config::new().cleanup_interval(Duration::ZERO),
            Err(Error::InvalidCleanupInterval)
        ));
        assert!(matches!(
            Config::new().eviction_samples(0),
            Err(Error::InvalidSampleSize)
        ));
        assert!(Config::new().shard_count(7).is_ok());
        assert!(Config::default().validate().is_ok());
    }
}
