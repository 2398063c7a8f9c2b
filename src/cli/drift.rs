use super::ui;
use crate::core::allocation::AllocationLevel;
use crate::core::config::{AllocationContext, AppConfig};
use crate::core::drift::{self, DriftRow};
use crate::core::holdings::{self, Holding};
use crate::core::price::PriceProvider;
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

/// Options of a single drift report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftOptions {
    pub level: AllocationLevel,
    /// Overrides `cash_to_invest` from the config.
    pub cash_to_invest: Option<f64>,
    pub core_only: bool,
}

pub async fn run(
    config: &AppConfig,
    context: &AllocationContext,
    price_provider: &(dyn PriceProvider + Send + Sync),
    options: DriftOptions,
) -> Result<()> {
    let holdings = super::load_holdings(config, context, price_provider).await?;
    let cash_to_invest = options.cash_to_invest.unwrap_or(config.cash_to_invest);

    let rows = compute(context, &holdings, options, cash_to_invest)?;
    println!(
        "{}",
        render_drift_table(&rows, options.level, &config.currency, cash_to_invest)
    );
    ui::print_separator();
    Ok(())
}

/// Groups `holdings` at the requested level and compares them with the
/// target allocation.
pub fn compute(
    context: &AllocationContext,
    holdings: &[Holding],
    options: DriftOptions,
    cash_to_invest: f64,
) -> Result<Vec<DriftRow>> {
    let selected: Vec<Holding> = holdings
        .iter()
        .filter(|h| !options.core_only || h.core)
        .cloned()
        .collect();
    debug!(
        selected = selected.len(),
        total = holdings.len(),
        "Selected holdings for drift analysis"
    );

    let rows = holdings::group_by(&selected, options.level.into());
    let drift_rows =
        drift::analyze_against_tree(&rows, &context.allocation, options.level, cash_to_invest)?;
    Ok(drift_rows)
}

pub fn render_drift_table(
    rows: &[DriftRow],
    level: AllocationLevel,
    currency: &str,
    cash_to_invest: f64,
) -> String {
    let mut sorted: Vec<&DriftRow> = rows.iter().collect();
    // Largest targets first, untargeted positions by value at the bottom
    sorted.sort_by(|a, b| {
        b.target_alloc
            .total_cmp(&a.target_alloc)
            .then(b.current_value.total_cmp(&a.current_value))
            .then(a.category.cmp(&b.category))
    });

    let category_header = match level {
        AllocationLevel::AssetClass => "Asset Class",
        AllocationLevel::Ticker => "Ticker",
    };

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(category_header),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("Current"),
        ui::header_cell("Target"),
        ui::header_cell("Drift"),
        ui::header_cell(&format!("Drift ({currency})")),
        ui::header_cell(&format!("Target ({currency})")),
        ui::header_cell("Action"),
    ]);

    for row in sorted {
        table.add_row(vec![
            Cell::new(&row.category),
            ui::money_cell(row.current_value),
            ui::fraction_cell(row.current_alloc),
            Cell::new(format!("{:.2}%", row.target_pct)),
            ui::drift_cell(format!("{:+.2}%", row.drift * 100.0), row.drift),
            ui::drift_cell(format!("{:+.2}", row.drift_value), row.drift_value),
            ui::money_cell(row.target_value),
            ui::action_cell(row.action),
        ]);
    }

    let held: f64 = rows.iter().map(|r| r.current_value).sum();
    format!(
        "{}\n\n{table}\n\n{}: {}\n{}: {}",
        ui::style_text("Allocation Drift", ui::StyleType::Title),
        ui::style_text(&format!("Holdings ({currency})"), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{held:.2}"), ui::StyleType::TotalValue),
        ui::style_text(&format!("Investable ({currency})"), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", held + cash_to_invest), ui::StyleType::TotalValue),
    )
}
