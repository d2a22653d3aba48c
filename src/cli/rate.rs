use super::ui;
use crate::core::{RateResolver, Resolution};
use anyhow::Result;
use comfy_table::Cell;

pub fn display_rates(rows: &[(String, String, Resolution)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Base"),
        ui::header_cell("Target"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
    ]);

    for (base, target, resolution) in rows {
        table.add_row(vec![
            Cell::new(base),
            Cell::new(target),
            ui::number_cell(format!("{:.6}", resolution.rate)),
            ui::origin_cell(resolution.origin),
        ]);
    }

    table.to_string()
}

/// Resolves `base` against each target and prints a table.
pub async fn run(resolver: &RateResolver, base: &str, targets: &[String]) -> Result<()> {
    let mut rows = Vec::with_capacity(targets.len());
    for target in targets {
        let resolution = resolver.resolve_detailed(base, target).await;
        rows.push((base.to_string(), target.clone(), resolution));
    }

    println!("{}", display_rates(&rows));

    if rows.iter().any(|(_, _, r)| r.is_degraded()) {
        println!(
            "\n{}",
            ui::style_text(
                "Some rates are approximate: the live provider was not used.",
                ui::StyleType::Warning
            )
        );
    }
    Ok(())
}
