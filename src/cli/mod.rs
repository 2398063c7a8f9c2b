//! Command implementations for the `folio-drift` binary

pub mod drift;
pub mod export;
pub mod setup;
pub mod summary;
pub mod targets;
pub mod ui;
pub mod validate;

use crate::core::config::{AllocationContext, AppConfig};
use crate::core::holdings::{self, Holding, HoldingRecord};
use crate::core::price::{self, PriceProvider};
use anyhow::{Result, bail};
use tracing::info;

/// Reads every configured holdings file, prices the securities and tags each
/// position with its asset class.
pub async fn load_holdings(
    config: &AppConfig,
    context: &AllocationContext,
    price_provider: &(dyn PriceProvider + Send + Sync),
) -> Result<Vec<Holding>> {
    if config.holdings.is_empty() {
        bail!("No holdings files configured");
    }

    let mut records: Vec<HoldingRecord> = Vec::new();
    for path in &config.holdings {
        records.extend(holdings::read_holdings_file(path)?);
    }

    let tickers = holdings::priced_tickers(&records);
    let pb = ui::new_progress_bar(tickers.len() as u64);
    pb.set_message("Fetching prices...");
    let prices = price::fetch_prices(price_provider, &tickers, &|| pb.inc(1)).await;
    pb.finish_and_clear();
    info!(
        "Priced {}/{} tickers for {} positions",
        prices.len(),
        tickers.len(),
        records.len()
    );

    Ok(holdings::enrich(&records, &prices, &context.classifier))
}
