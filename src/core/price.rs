//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResult {
    pub price: f64,
    pub currency: String,
    pub short_name: Option<String>,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult>;
}

/// Fetches all `symbols` concurrently. Failed lookups are logged and left
/// out of the returned map.
pub async fn fetch_prices(
    provider: &(dyn PriceProvider + Send + Sync),
    symbols: &[String],
    update_callback: &(dyn Fn() + Sync),
) -> HashMap<String, f64> {
    let price_futures = symbols.iter().map(|symbol| async move {
        let res = provider.fetch_price(symbol).await;
        update_callback();
        (symbol.clone(), res)
    });

    join_all(price_futures)
        .await
        .into_iter()
        .filter_map(|(symbol, res)| match res {
            Ok(price) => Some((symbol, price.price)),
            Err(e) => {
                warn!(%symbol, error = %e, "Price fetch failed");
                None
            }
        })
        .collect()
}
