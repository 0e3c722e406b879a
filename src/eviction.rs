//! Approximate LRU: pick the least recently used entry out of a small sample.

use crate::entry::Entry;

/// Victim selection over the first `samples` entries a shard yields.
///
/// The shard map's iteration order decides which entries are sampled. That
/// order is arbitrary, so the sample behaves like a random one; the cost is
/// O(samples) regardless of shard size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SampledLru {
    samples: usize,
}

impl SampledLru {
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }

    /// How many entries a shard holding `len` entries contributes to a sample.
    #[inline]
    pub fn sample_len(&self, len: usize) -> usize {
        self.samples.min(len)
    }

    /// Return the key with the oldest `last_access` among the sampled entries.
    ///
    /// Ties go to the first sampled entry. `None` when there is nothing to sample.
    pub fn select_victim<'a, K, V, I>(&self, entries: I) -> Option<&'a K>
    where
        I: IntoIterator<Item = (&'a K, &'a Box<Entry<V>>)>,
        K: 'a,
        V: 'a,
    {
        entries
            .into_iter()
            .take(self.samples)
            .min_by_key(|(_, entry)| entry.last_access())
            .map(|(key, _)| key)
    }
}
