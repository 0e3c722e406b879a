//! # ShardCache
//!
//! A concurrent, TTL-bounded in-process key-value cache.
//!
//! ShardCache splits keys across many shards, each with its own read-write
//! lock, so operations on different shards never block each other and reads
//! on the same shard run in parallel. Every entry carries an absolute
//! deadline checked with a single atomic load; expired entries are removed
//! lazily on read and periodically by a background reaper.
//!
//! ## Features
//!
//! - **Sharded locking**: no global lock anywhere on the hot path
//! - **TTL**: default TTL per cache, optional override per call
//! - **Bounded shards**: approximate-LRU eviction by sampling a few entries
//! - **Entry recycling**: released entries are reused instead of reallocated
//! - **Background reaper**: two-phase sweep that holds write locks briefly
//! - **Statistics**: lock-free hit, miss, eviction and expiration counters
//!
//! ## Example
//!
//! ```rust
//! use shardcache::Cache;
//! use std::time::Duration;
//!
//! let cache = Cache::new(Duration::from_secs(300))?;
//!
//! // Insert values
//! cache.set("user:1".to_string(), "Ada");
//! cache.set_with_ttl("session:abc".to_string(), "active", Some(Duration::from_secs(30)));
//!
//! // Read values (copied out)
//! if let Some(name) = cache.get("user:1") {
//!     println!("Found: {}", name);
//! }
//!
//! // Remove values
//! cache.delete("user:1");
//!
//! // Get statistics
//! let stats = cache.stats();
//! println!("entries: {}, hit rate: {:.1}%", stats.size, stats.hit_rate());
//!
//! // Stop the background reaper
//! cache.close();
//! # Ok::<(), shardcache::Error>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use shardcache::{CacheBuilder, HashFunction};
//! use std::time::Duration;
//!
//! let cache = CacheBuilder::new()
//!     .default_ttl(Duration::from_secs(60))
//!     .max_capacity_per_shard(10_000)
//!     .shard_count(64)?
//!     .cleanup_interval(Duration::from_secs(10))?
//!     .hash_function(HashFunction::AHash)
//!     .build::<String, Vec<u8>>()?;
//! # Ok::<(), shardcache::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Main Cache implementation.
pub mod cache;
/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Hash function implementations.
pub mod hash;
/// Statistics and metrics collection.
pub mod stats;

mod entry;
mod eviction;
mod expiry;
mod reaper;
mod shard;

// Re-export main types
pub use cache::Cache;
pub use config::{CacheBuilder, Config, HashFunction, RoutingConfig, ShardRouter};
pub use error::Error;
pub use stats::Stats;
