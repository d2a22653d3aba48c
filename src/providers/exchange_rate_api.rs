use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::config::ProviderConfig;
use crate::core::currency::{RateSource, is_valid_rate};
use crate::core::error::ProviderError;
use crate::providers::util::{RetryPolicy, with_retry};

/// Client for the exchangerate-api.com `latest` endpoint:
/// `GET {base_url}/{version}/{api_key}/latest/{base}`.
pub struct ExchangeRateApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        Ok(ExchangeRateApiProvider {
            client: reqwest::Client::builder().user_agent("fxrate/1.0").build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: "v6".to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        })
    }

    /// Builds the client from configuration, reading the credential from the
    /// environment variable the config names.
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.as_deref().is_none_or(str::is_empty) {
            debug!(
                env = %config.api_key_env,
                "No API key configured, provider disabled"
            );
        }
        Ok(Self::new(&config.base_url, api_key)?
            .with_api_version(&config.api_version)
            .with_timeout(config.timeout())
            .with_retry_policy(config.retry_policy()))
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::Unconfigured)
    }

    /// Single attempt bounded by the configured timeout.
    async fn fetch_once(
        &self,
        api_key: &str,
        base: &str,
    ) -> Result<HashMap<String, f64>, ProviderError> {
        let url = format!(
            "{}/{}/{}/latest/{}",
            self.base_url, self.api_version, api_key, base
        );

        let request = async {
            let response = self
                .client
                .get(&url)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

            if !response.status().is_success() {
                return Err(ProviderError::Status(response.status()));
            }

            let text = response
                .text()
                .await
                .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

            serde_json::from_str::<LatestRatesResponse>(&text)
                .map_err(|e| ProviderError::Malformed(format!("{base}: {e}")))
        };

        let data = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        if let Some(result) = data.result.as_deref() {
            if result != "success" {
                return Err(ProviderError::Rejected(
                    data.error_type.unwrap_or_else(|| result.to_string()),
                ));
            }
        }

        data.conversion_rates
            .ok_or_else(|| ProviderError::Malformed(format!("{base}: missing conversion_rates")))
    }

    fn pick_rate(
        rates: &HashMap<String, f64>,
        base: &str,
        target: &str,
    ) -> Result<f64, ProviderError> {
        let rate = rates
            .get(target)
            .copied()
            .ok_or_else(|| ProviderError::MissingRate {
                base: base.to_string(),
                target: target.to_string(),
            })?;
        if !is_valid_rate(rate) {
            return Err(ProviderError::InvalidRate {
                target: target.to_string(),
                rate,
            });
        }
        Ok(rate)
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch(&self, base: &str) -> Result<HashMap<String, f64>, ProviderError> {
        let api_key = self.api_key()?;
        with_retry(
            || self.fetch_once(api_key, base),
            &self.retry,
            ProviderError::is_retryable,
        )
        .await
        .inspect_err(|e| warn!(error = %e, attempts = self.retry.max_attempts, "Rate fetch failed"))
    }

    #[instrument(
        name = "ExchangeRateFetchPair",
        skip(self),
        fields(base = %base, target = %target)
    )]
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64, ProviderError> {
        let api_key = self.api_key()?;
        let rate = with_retry(
            || async {
                let rates = self.fetch_once(api_key, base).await?;
                Self::pick_rate(&rates, base, target)
            },
            &self.retry,
            ProviderError::is_retryable,
        )
        .await
        .inspect_err(|e| {
            warn!(error = %e, attempts = self.retry.max_attempts, "Rate fetch failed")
        })?;

        debug!(rate, "Received provider rate");
        Ok(rate)
    }
}
