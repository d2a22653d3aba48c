//! Currency conversion abstractions

use crate::core::error::ProviderError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;

/// Consumer-facing seam used by aggregation code.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// An upstream source of live rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Latest rates quoted against `base`.
    async fn fetch(&self, base: &str) -> Result<HashMap<String, f64>, ProviderError>;

    /// Rate for a single pair. Must fail with `ProviderError::Unconfigured`
    /// without touching the network when no credential is available.
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64, ProviderError>;
}

/// Cache key for a directed currency pair. Codes are compared exactly as
/// received; no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub base: String,
    pub target: String,
}

impl RateKey {
    pub fn new(base: &str, target: &str) -> Self {
        Self {
            base: base.to_string(),
            target: target.to_string(),
        }
    }
}

impl Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.base, self.target)
    }
}

/// Where a cached rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Live provider value.
    Confirmed,
    /// Static fallback table value.
    Degraded,
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Confirmed => write!(f, "confirmed"),
            Provenance::Degraded => write!(f, "degraded"),
        }
    }
}

/// Why the provider was not used for a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Unconfigured,
    BreakerOpen,
    ProviderFailed,
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Unconfigured => write!(f, "no credential"),
            FallbackReason::BreakerOpen => write!(f, "circuit open"),
            FallbackReason::ProviderFailed => write!(f, "provider failed"),
        }
    }
}

/// How a resolved rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Identity,
    Cache(Provenance),
    Provider,
    Fallback(FallbackReason),
    /// No fallback path existed; the identity rate was substituted.
    Unresolvable(FallbackReason),
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Identity => write!(f, "identity"),
            Origin::Cache(provenance) => write!(f, "cache ({provenance})"),
            Origin::Provider => write!(f, "provider"),
            Origin::Fallback(reason) => write!(f, "fallback ({reason})"),
            Origin::Unresolvable(reason) => write!(f, "unresolvable, using 1:1 ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub rate: f64,
    pub origin: Origin,
}

impl Resolution {
    pub fn identity() -> Self {
        Self {
            rate: 1.0,
            origin: Origin::Identity,
        }
    }

    /// True when the rate is approximate or substituted.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.origin,
            Origin::Cache(Provenance::Degraded) | Origin::Fallback(_) | Origin::Unresolvable(_)
        )
    }
}

/// Valid rates are finite and strictly positive.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}
