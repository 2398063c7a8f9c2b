use crate::core::config::{AllocationContext, AppConfig};
use crate::core::holdings;
use crate::core::price::PriceProvider;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Writes the priced holdings, aggregated per account, asset class and
/// ticker, to `output` as CSV.
pub async fn run(
    config: &AppConfig,
    context: &AllocationContext,
    price_provider: &(dyn PriceProvider + Send + Sync),
    output: &Path,
) -> Result<()> {
    let holdings = super::load_holdings(config, context, price_provider).await?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create export file: {}", output.display()))?;
    holdings::export_aggregated_csv(&holdings, file)
        .with_context(|| format!("Failed to export holdings to {}", output.display()))?;

    info!("Exported {} holdings to {}", holdings.len(), output.display());
    Ok(())
}
