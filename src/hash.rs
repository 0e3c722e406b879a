use std::hash::{Hash, Hasher};

/// Hash function implementation for shard assignment.
/// Uses an enum to avoid trait object limitations with generics.
///
/// Both variants are seeded with fixed keys, so a key hashes to the same value
/// for the whole lifetime of a cache (and across caches with equal config).
pub enum ShardHasher {
    /// AHash implementation (default, fast and well-distributed).
    AHash,
    /// FxHash implementation (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

impl ShardHasher {
    /// Hash a key to determine which shard it belongs to.
    ///
    /// Accepts borrowed key forms; `Borrow` guarantees they hash like the owned key.
    pub fn hash_key<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        match self {
            ShardHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            ShardHasher::FxHash => {
                let mut hasher = fxhash::FxHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}

impl Default for ShardHasher {
    fn default() -> Self {
        ShardHasher::AHash
    }
}
