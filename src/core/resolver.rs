//! Resolution of conversion rates with caching, circuit breaking and fallback

use crate::core::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::core::cache::{RateCache, RateCacheEntry};
use crate::core::currency::{
    CurrencyRateProvider, FallbackReason, Origin, Provenance, RateKey, RateSource, Resolution,
};
use crate::core::error::ProviderError;
use crate::core::fallback::FallbackGraph;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Resolves `base -> target` rates. Owns its cache and breaker; the
/// provider and fallback table are injected.
pub struct RateResolver {
    source: Arc<dyn RateSource>,
    fallback: FallbackGraph,
    cache: RateCache,
    breaker: CircuitBreaker,
    in_flight: Mutex<HashMap<RateKey, Arc<Mutex<()>>>>,
}

impl RateResolver {
    pub fn new(
        source: Arc<dyn RateSource>,
        fallback: FallbackGraph,
        cache: RateCache,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            source,
            fallback,
            cache,
            breaker,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Conversion multiplier such that `amount_in_target = amount_in_base * rate`.
    pub async fn resolve(&self, base: &str, target: &str) -> f64 {
        self.resolve_detailed(base, target).await.rate
    }

    #[instrument(name = "ResolveRate", skip(self))]
    pub async fn resolve_detailed(&self, base: &str, target: &str) -> Resolution {
        if base == target {
            return Resolution::identity();
        }

        let key = RateKey::new(base, target);
        if let Some(entry) = self.cache.get(&key).await {
            return Self::from_cache(entry);
        }

        // One provider sequence per key at a time; later callers re-check the cache.
        let flight = self.flight_lock(&key).await;
        let resolution = {
            let _guard = flight.lock().await;
            match self.cache.get(&key).await {
                Some(entry) => Self::from_cache(entry),
                None => self.resolve_uncached(key.clone()).await,
            }
        };
        self.release_flight(&key, flight).await;
        resolution
    }

    async fn resolve_uncached(&self, key: RateKey) -> Resolution {
        if !self.breaker.allows_request().await {
            return self.fall_back(key, FallbackReason::BreakerOpen).await;
        }

        match self.source.fetch_rate(&key.base, &key.target).await {
            Ok(rate) => {
                self.breaker.record_success().await;
                self.cache.put(key, rate, Provenance::Confirmed).await;
                debug!(rate, "Provider rate resolved");
                Resolution {
                    rate,
                    origin: Origin::Provider,
                }
            }
            Err(ProviderError::Unconfigured) => {
                debug!("No provider credential, using fallback rates");
                self.fall_back(key, FallbackReason::Unconfigured).await
            }
            Err(err) => {
                self.breaker.record_failure().await;
                warn!(error = %err, "Provider unavailable, using fallback rates");
                self.fall_back(key, FallbackReason::ProviderFailed).await
            }
        }
    }

    /// Current cache entry for a pair, expired or not.
    pub async fn cached(&self, base: &str, target: &str) -> Option<RateCacheEntry> {
        self.cache.peek(&RateKey::new(base, target)).await
    }

    pub async fn breaker(&self) -> BreakerSnapshot {
        self.breaker.snapshot().await
    }

    pub fn fallback(&self) -> &FallbackGraph {
        &self.fallback
    }

    fn from_cache(entry: RateCacheEntry) -> Resolution {
        Resolution {
            rate: entry.rate,
            origin: Origin::Cache(entry.provenance),
        }
    }

    async fn fall_back(&self, key: RateKey, reason: FallbackReason) -> Resolution {
        let resolution = match self.fallback.derive(&key.base, &key.target) {
            Some(rate) => Resolution {
                rate,
                origin: Origin::Fallback(reason),
            },
            None => {
                warn!(pair = %key, "No conversion rate found, using 1:1");
                Resolution {
                    rate: 1.0,
                    origin: Origin::Unresolvable(reason),
                }
            }
        };

        self.cache.put(key, resolution.rate, Provenance::Degraded).await;
        resolution
    }

    async fn flight_lock(&self, key: &RateKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    /// Drops the per-key lock once no other caller holds or awaits it.
    async fn release_flight(&self, key: &RateKey, flight: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // The map and `flight` itself account for two references
        if Arc::strong_count(&flight) <= 2 {
            in_flight.remove(key);
        }
        // Released under the map lock so the next caller sees an exact count
        drop(flight);
    }
}

#[async_trait]
impl CurrencyRateProvider for RateResolver {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        Ok(self.resolve(from, to).await)
    }
}
