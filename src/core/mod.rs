//! Core rate resolution logic

pub mod breaker;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod fallback;
pub mod log;
pub mod money;
pub mod resolver;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRateProvider, Origin, Provenance, RateSource, Resolution};
pub use error::ProviderError;
pub use resolver::RateResolver;
