use super::ui;
use crate::core::RateResolver;
use crate::core::money::{Amount, apply_rate, total_in};
use anyhow::Result;

/// Converts a single amount and prints it.
pub async fn run(resolver: &RateResolver, amount: &Amount, target: &str) -> Result<()> {
    let resolution = resolver.resolve_detailed(&amount.currency, target).await;
    let converted = Amount::new(apply_rate(amount.value, resolution.rate)?, target);

    let note = format!("(rate {:.6}, {})", resolution.rate, resolution.origin);
    let note_style = if resolution.is_degraded() {
        ui::StyleType::Warning
    } else {
        ui::StyleType::TotalLabel
    };
    println!(
        "{} = {}  {}",
        amount,
        ui::style_text(&converted.to_string(), ui::StyleType::TotalValue),
        ui::style_text(&note, note_style)
    );
    Ok(())
}

/// Sums amounts in mixed currencies into `target` and prints the total.
pub async fn run_total(resolver: &RateResolver, amounts: &[Amount], target: &str) -> Result<()> {
    let total = total_in(resolver, amounts, target).await?;
    println!(
        "{} ({}): {}",
        ui::style_text("Total", ui::StyleType::Title),
        ui::style_text(target, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
    );
    Ok(())
}
