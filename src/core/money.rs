//! Converting and summing amounts across currencies

use crate::core::currency::CurrencyRateProvider;
use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub value: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(value: Decimal, currency: &str) -> Self {
        Self {
            value,
            currency: currency.to_string(),
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.value, self.currency)
    }
}

/// Parses `VALUE:CURRENCY`, e.g. `12.50:EUR`.
impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, currency) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid amount '{}', expected VALUE:CURRENCY", s))?;
        if currency.is_empty() {
            return Err(anyhow!("Missing currency in amount '{}'", s));
        }
        let value = Decimal::from_str(value.trim())
            .with_context(|| format!("Invalid number in amount '{s}'"))?;
        Ok(Self::new(value, currency.trim()))
    }
}

/// Multiplies an amount by a floating point rate.
pub fn apply_rate(value: Decimal, rate: f64) -> Result<Decimal> {
    let rate =
        Decimal::from_f64(rate).ok_or_else(|| anyhow!("Rate {} is not representable", rate))?;
    value
        .checked_mul(rate)
        .ok_or_else(|| anyhow!("Overflow converting {} at rate {}", value, rate))
}

pub async fn convert_amount(
    provider: &dyn CurrencyRateProvider,
    amount: &Amount,
    target: &str,
) -> Result<Amount> {
    let rate = provider.get_rate(&amount.currency, target).await?;
    Ok(Amount::new(apply_rate(amount.value, rate)?, target))
}

/// Sum of `amounts` expressed in `target`. Each distinct source currency is
/// resolved once.
pub async fn total_in(
    provider: &dyn CurrencyRateProvider,
    amounts: &[Amount],
    target: &str,
) -> Result<Decimal> {
    let mut currencies: Vec<&str> = amounts.iter().map(|a| a.currency.as_str()).collect();
    currencies.sort_unstable();
    currencies.dedup();

    let rates = join_all(currencies.iter().map(|c| provider.get_rate(c, target))).await;
    let rates: HashMap<&str, f64> = currencies
        .into_iter()
        .zip(rates)
        .map(|(c, rate)| rate.map(|r| (c, r)))
        .collect::<Result<_>>()?;

    amounts.iter().try_fold(Decimal::ZERO, |total, amount| {
        let converted = apply_rate(amount.value, rates[amount.currency.as_str()])?;
        total
            .checked_add(converted)
            .ok_or_else(|| anyhow!("Overflow summing amounts"))
    })
}
