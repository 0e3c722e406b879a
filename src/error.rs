use thiserror::Error;

/// Errors that can occur when constructing a Cache.
///
/// Normal cache operations never fail: a missing or expired key is reported
/// as `None`, not as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The shard count is invalid (must be greater than 0).
    #[error("shard count must be greater than 0")]
    InvalidShardCount,
    /// The reaper interval is invalid (must be non-zero).
    #[error("cleanup interval must be greater than zero")]
    InvalidCleanupInterval,
    /// The eviction sample size is invalid (must be greater than 0).
    #[error("eviction sample size must be greater than 0")]
    InvalidSampleSize,
    /// The background reaper thread could not be started.
    #[error("failed to spawn reaper thread: {0}")]
    ReaperSpawn(#[from] std::io::Error),
}
