//! Absolute-deadline expiration on a monotonic clock.
//!
//! Deadlines are stored as nanoseconds since the cache's epoch in an
//! `AtomicU64`, so the hot path checks expiry with a single load and no lock.

use std::time::{Duration, Instant};

/// Deadline value meaning "never expires".
pub(crate) const NO_EXPIRY: u64 = 0;

/// Monotonic time source, anchored at cache construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the epoch.
    #[inline]
    pub fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Deadline for an entry written at `now` with the given TTL.
    ///
    /// A zero TTL yields [`NO_EXPIRY`]. Positive TTLs never produce the
    /// sentinel, even when written at the epoch.
    #[inline]
    pub fn deadline(&self, now: u64, ttl: Duration) -> u64 {
        if ttl.is_zero() {
            return NO_EXPIRY;
        }
        let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        now.saturating_add(ttl).max(1)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// An entry is logically absent iff it has a deadline and `now` is past it.
#[inline]
pub(crate) fn is_expired(deadline: u64, now: u64) -> bool {
    deadline != NO_EXPIRY && now > deadline
}

/// Normalize a per-call TTL override: absent or zero means "use the default".
#[inline]
pub(crate) fn effective_ttl(ttl: Option<Duration>, default_ttl: Duration) -> Duration {
    match ttl {
        Some(ttl) if !ttl.is_zero() => ttl,
        _ => default_ttl,
    }
}
