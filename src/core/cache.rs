use crate::core::currency::{Provenance, RateKey};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCacheEntry {
    pub rate: f64,
    /// `None` when the TTL reaches past what `Instant` can represent
    pub expires_at: Option<Instant>,
    pub provenance: Provenance,
}

impl RateCacheEntry {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Instant::now())
    }
}

/// In-memory rate cache. Entries are never deleted; expired ones are ignored
/// on read and overwritten by the next resolution for the same key.
pub struct RateCache {
    inner: Mutex<HashMap<RateKey, RateCacheEntry>>,
    confirmed_ttl: Duration,
    degraded_ttl: Duration,
}

impl RateCache {
    pub fn new(confirmed_ttl: Duration, degraded_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            confirmed_ttl,
            degraded_ttl,
        }
    }

    pub fn ttl_for(&self, provenance: Provenance) -> Duration {
        match provenance {
            Provenance::Confirmed => self.confirmed_ttl,
            Provenance::Degraded => self.degraded_ttl,
        }
    }

    /// Returns the entry only if it has not expired.
    pub async fn get(&self, key: &RateKey) -> Option<RateCacheEntry> {
        let cache = self.inner.lock().await;
        match cache.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!("Cache entry expired for key: {}", key);
                None
            }
            Some(entry) => {
                debug!("Cache HIT for key: {}", key);
                Some(*entry)
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    /// Returns the stored entry even if expired.
    pub async fn peek(&self, key: &RateKey) -> Option<RateCacheEntry> {
        self.inner.lock().await.get(key).copied()
    }

    pub async fn put(&self, key: RateKey, rate: f64, provenance: Provenance) -> RateCacheEntry {
        let entry = RateCacheEntry {
            rate,
            expires_at: Instant::now().checked_add(self.ttl_for(provenance)),
            provenance,
        };

        let mut cache = self.inner.lock().await;
        debug!(%provenance, rate, "Cache PUT for key: {}", key);
        cache.insert(key, entry);
        entry
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300), Duration::from_secs(30))
    }
}
