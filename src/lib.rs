pub mod cli;
pub mod core;
pub mod providers;

use crate::core::RateResolver;
use crate::core::config::AppConfig;
use crate::core::money::Amount;
use crate::providers::exchange_rate_api::ExchangeRateApiProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rate { base: String, targets: Vec<String> },
    Convert { amount: Amount, target: String },
    Total { amounts: Vec<Amount>, target: String },
}

/// Wires the HTTP provider, fallback table, cache and breaker described by
/// `config` into a resolver.
pub fn build_resolver(config: &AppConfig) -> Result<RateResolver> {
    let provider = ExchangeRateApiProvider::from_config(&config.provider)?;
    info!(
        live = provider.is_configured(),
        "Rate provider initialised"
    );

    Ok(RateResolver::new(
        Arc::new(provider),
        config.fallback.build()?,
        config.cache.build(),
        config.breaker.build(),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let resolver = build_resolver(&config)?;

    match command {
        AppCommand::Rate { base, targets } => cli::rate::run(&resolver, &base, &targets).await,
        AppCommand::Convert { amount, target } => {
            cli::convert::run(&resolver, &amount, &target).await
        }
        AppCommand::Total { amounts, target } => {
            cli::convert::run_total(&resolver, &amounts, &target).await
        }
    }
}
