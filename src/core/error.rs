//! Failures reported by rate providers

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// A single provider failure. Everything except `Unconfigured` is transient
/// and eligible for retry.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("No API credential configured")]
    Unconfigured,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Status(StatusCode),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Failed to parse response: {0}")]
    Malformed(String),

    #[error("Provider rejected request: {0}")]
    Rejected(String),

    #[error("Rate not found for {base} to {target}")]
    MissingRate { base: String, target: String },

    #[error("Invalid rate {rate} for {target}")]
    InvalidRate { target: String, rate: f64 },
}

impl ProviderError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Unconfigured)
    }
}
