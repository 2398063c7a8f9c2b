use super::ui;
use crate::core::config::{AllocationContext, AppConfig};
use crate::core::holdings::{self, GroupBy, Holding, PortfolioTotals};
use crate::core::price::PriceProvider;
use anyhow::Result;
use comfy_table::Cell;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    pub group_by: GroupBy,
    /// Restricts the breakdown to the core portfolio. Totals always cover
    /// every holding.
    pub core_only: bool,
}

pub async fn run(
    config: &AppConfig,
    context: &AllocationContext,
    price_provider: &(dyn PriceProvider + Send + Sync),
    options: SummaryOptions,
) -> Result<()> {
    let holdings = super::load_holdings(config, context, price_provider).await?;
    println!("{}", render_summary(&holdings, options, &config.currency));
    ui::print_separator();
    Ok(())
}

pub fn render_totals_table(totals: &PortfolioTotals, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Total Portfolio"),
        ui::header_cell("Core"),
        ui::header_cell("CDs"),
        ui::header_cell("Treasuries"),
        ui::header_cell("Money Market"),
        ui::header_cell("Cash"),
    ]);
    table.add_row(vec![
        ui::money_cell(totals.total),
        ui::money_cell(totals.core),
        ui::money_cell(totals.cds),
        ui::money_cell(totals.treasuries),
        ui::money_cell(totals.money_market),
        ui::money_cell(totals.cash),
    ]);

    format!(
        "{} ({currency})\n\n{table}",
        ui::style_text("Portfolio Summary", ui::StyleType::Title)
    )
}

pub fn render_breakdown_table(holdings: &[Holding], group_by: GroupBy, currency: &str) -> String {
    let groups = holdings::aggregate_by(holdings, group_by);
    let total: f64 = groups.iter().map(|g| g.current_value).sum();

    let key_header = match group_by {
        GroupBy::Account => "Account",
        GroupBy::AssetClass => "Asset Class",
        GroupBy::Ticker => "Ticker",
    };

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(key_header),
        ui::header_cell("Quantity"),
        ui::header_cell(&format!("Cost Basis ({currency})")),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("Weight"),
    ]);

    for group in &groups {
        let weight = if total == 0.0 {
            0.0
        } else {
            group.current_value / total
        };
        table.add_row(vec![
            Cell::new(&group.key),
            ui::money_cell(group.quantity),
            ui::money_cell(group.cost_basis),
            ui::money_cell(group.current_value),
            ui::fraction_cell(weight),
        ]);
    }

    format!(
        "{table}\n\n{}: {}",
        ui::style_text(&format!("Total Value ({currency})"), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
    )
}

pub fn render_summary(holdings: &[Holding], options: SummaryOptions, currency: &str) -> String {
    let totals = PortfolioTotals::from_holdings(holdings);
    let selected: Vec<Holding> = holdings
        .iter()
        .filter(|h| !options.core_only || h.core)
        .cloned()
        .collect();

    let title = if options.core_only {
        "Holdings (Core)"
    } else {
        "Holdings"
    };
    format!(
        "{}\n\n{}\n\n{}",
        render_totals_table(&totals, currency),
        ui::style_text(title, ui::StyleType::Title),
        render_breakdown_table(&selected, options.group_by, currency)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::Classifier;
    use crate::core::holdings::HoldingRecord;
    use crate::core::taxonomy::{Classification, TaxonomyConfig};
    use std::collections::HashMap;

    fn holdings() -> Vec<Holding> {
        let yaml = r#"
name: Asset Classes
children:
  - name: US Equities
    children:
      - name: ITOT
      - name: AAPL
  - name: Short-Term
    children:
      - name: Cash
      - name: CD
"#;
        let config: TaxonomyConfig = serde_yaml::from_str(yaml).unwrap();
        let classifier =
            Classifier::new(Classification::from_config(&config), vec!["AAPL".to_string()]);

        let record = |account: &str, ticker: &str, description: &str, quantity: f64| HoldingRecord {
            account_name: account.to_string(),
            ticker: ticker.to_string(),
            description: description.to_string(),
            quantity,
            cost_basis: Some(quantity),
        };
        let records = vec![
            record("Brokerage", "ITOT", "ISHARES CORE S&P TOTAL US STOCK MKT ETF", 40.0),
            record("Brokerage", "AAPL", "APPLE INC", 5.0),
            record("Brokerage", "CORE", "FDIC-INSURED DEPOSIT SWEEP", 750.0),
            record("IRA", "CD999", "BANK OF RUST CD 5.000% 01/01/2027", 3000.0),
        ];
        let prices = HashMap::from([("ITOT".to_string(), 100.0), ("AAPL".to_string(), 200.0)]);
        holdings::enrich(&records, &prices, &classifier)
    }

    #[test]
    fn test_render_totals_table() {
        let totals = PortfolioTotals::from_holdings(&holdings());
        assert_eq!(totals.total, 8750.0);
        assert_eq!(totals.core, 7750.0);

        let output = render_totals_table(&totals, "USD");
        assert!(output.contains("Portfolio Summary"));
        for header in ["Total Portfolio", "Core", "CDs", "Treasuries", "Money Market", "Cash"] {
            assert!(output.contains(header), "missing {header}");
        }
        assert!(output.contains("8750.00"));
        assert!(output.contains("7750.00"));
        assert!(output.contains("3000.00"));
        assert!(output.contains("750.00"));
    }

    #[test]
    fn test_breakdown_by_account() {
        let output = render_breakdown_table(&holdings(), GroupBy::Account, "USD");
        assert!(output.contains("Account"));
        assert!(output.contains("Brokerage"));
        assert!(output.contains("5750.00"));
        assert!(output.contains("65.71%"));
        assert!(output.contains("34.29%"));
        assert!(output.contains("8750.00"));
    }

    #[test]
    fn test_summary_core_only_keeps_full_totals() {
        let options = SummaryOptions {
            group_by: GroupBy::Ticker,
            core_only: true,
        };
        let output = render_summary(&holdings(), options, "USD");
        assert!(output.contains("Holdings (Core)"));
        assert!(!output.contains("AAPL"));
        // Totals row still counts the single stock
        assert!(output.contains("8750.00"));
        assert!(output.contains("Total Value (USD): 7750.00"));
    }

    #[test]
    fn test_breakdown_of_no_holdings() {
        let output = render_breakdown_table(&[], GroupBy::AssetClass, "USD");
        assert!(output.contains("Asset Class"));
        assert!(output.contains("0.00"));
    }
}
