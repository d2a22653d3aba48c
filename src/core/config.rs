use crate::core::breaker::CircuitBreaker;
use crate::core::cache::RateCache;
use crate::core::fallback::{DEFAULT_HUB, FallbackGraph, RateTable, default_rate_table};
use crate::providers::util::RetryPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_version: String,
    /// Environment variable holding the API credential
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: "https://v6.exchangerate-api.com".to_string(),
            api_version: "v6".to_string(),
            api_key_env: "EXCHANGE_RATES_API_KEY".to_string(),
            timeout_secs: 10,
            max_attempts: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub confirmed_ttl_secs: u64,
    pub degraded_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            confirmed_ttl_secs: 300,
            degraded_ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn build(&self) -> RateCache {
        RateCache::new(
            Duration::from_secs(self.confirmed_ttl_secs),
            Duration::from_secs(self.degraded_ttl_secs),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl BreakerConfig {
    pub fn build(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.failure_threshold,
            Duration::from_secs(self.cooldown_secs),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    pub hub: String,
    /// Replaces the built-in table when present
    pub rates: Option<RateTable>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            hub: DEFAULT_HUB.to_string(),
            rates: None,
        }
    }
}

impl FallbackConfig {
    pub fn build(&self) -> Result<FallbackGraph> {
        let rates = self.rates.clone().unwrap_or_else(default_rate_table);
        FallbackGraph::new(&self.hub, rates).context("Invalid fallback rate table")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub breaker: BreakerConfig,
    pub fallback: FallbackConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults if there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxrate", "fxrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to null
        let config = serde_yaml::from_str::<Option<Self>>(yaml)?.unwrap_or_default();
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{Provenance, RateKey};

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.provider.api_key_env, "EXCHANGE_RATES_API_KEY");
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert_eq!(config.provider.retry_policy(), RetryPolicy::default());
        assert_eq!(
            config.cache.degraded_ttl_secs * 10,
            config.cache.confirmed_ttl_secs
        );
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.cooldown_secs, 60);
        assert_eq!(config.fallback.hub, "USD");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
        assert_eq!(AppConfig::from_yaml("---\n").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://localhost:9999"
  api_key_env: "MY_RATES_KEY"
  max_attempts: 5
cache:
  confirmed_ttl_secs: 600
breaker:
  cooldown_secs: 120
fallback:
  hub: EUR
  rates:
    EUR:
      USD: 1.1
      GBP: 0.86
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://localhost:9999");
        assert_eq!(config.provider.api_key_env, "MY_RATES_KEY");
        assert_eq!(config.provider.max_attempts, 5);
        // Unset fields keep defaults
        assert_eq!(config.provider.api_version, "v6");
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.cache.confirmed_ttl_secs, 600);
        assert_eq!(config.cache.degraded_ttl_secs, 30);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.cooldown_secs, 120);

        let graph = config.fallback.build().unwrap();
        assert_eq!(graph.hub(), "EUR");
        assert_eq!(graph.edge("EUR", "GBP"), Some(0.86));
        assert_eq!(graph.edge("USD", "EUR"), None);
    }

    #[test]
    fn test_invalid_fallback_rate_is_rejected() {
        let yaml_str = r#"
fallback:
  rates:
    USD:
      EUR: -1.0
"#;
        let config = AppConfig::from_yaml(yaml_str).unwrap();
        let err = config.fallback.build().unwrap_err();
        assert!(err.to_string().contains("Invalid fallback rate table"));
    }

    #[tokio::test]
    async fn test_huge_cache_ttl_is_usable() {
        let config = AppConfig::from_yaml("cache:\n  confirmed_ttl_secs: 18446744073709551615\n")
            .unwrap();
        let cache = config.cache.build();
        let key = RateKey::new("USD", "EUR");

        cache.put(key.clone(), 0.9, Provenance::Confirmed).await;
        assert_eq!(cache.get(&key).await.unwrap().rate, 0.9);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/nonexistent/fxrate/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
