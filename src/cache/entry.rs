//! Cache entry with an absolute expiry instant.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    pub(crate) expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Valid up to and including `expires_at`; invalid strictly after it.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}
