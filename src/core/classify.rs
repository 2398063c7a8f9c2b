//! Ticker → asset-class reverse lookup.
use crate::core::taxonomy::{AllocationTree, Classification};
use std::collections::HashSet;
use tracing::debug;

/// Asset class reported for tickers missing from the classification.
pub const UNKNOWN_ASSET_CLASS: &str = "Unknown";

/// Tags holdings with their asset class and core/non-core status.
#[derive(Debug, Clone)]
pub struct Classifier {
    taxonomy: Classification,
    single_stocks: HashSet<String>,
}

impl Classifier {
    pub fn new(taxonomy: Classification, single_stocks: impl IntoIterator<Item = String>) -> Self {
        Self {
            taxonomy,
            single_stocks: single_stocks.into_iter().collect(),
        }
    }

    /// Reuses the shape of the target allocation when no separate
    /// classification is configured.
    pub fn from_allocation(
        allocation: &AllocationTree,
        single_stocks: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::new(allocation.map_weights(|_| ()), single_stocks)
    }

    pub fn taxonomy(&self) -> &Classification {
        &self.taxonomy
    }

    /// The first-tier category above `ticker`, or [`UNKNOWN_ASSET_CLASS`].
    pub fn asset_class(&self, ticker: &str) -> String {
        let found = self.taxonomy.search(ticker).and_then(|node| {
            let hierarchy = node.hierarchy();
            hierarchy.get(1).map(|name| name.to_string())
        });
        match found {
            Some(asset_class) => asset_class,
            None => {
                debug!(ticker, "No asset class found, using {UNKNOWN_ASSET_CLASS}");
                UNKNOWN_ASSET_CLASS.to_string()
            }
        }
    }

    /// Single stocks are tracked but sit outside the core portfolio.
    pub fn is_core(&self, ticker: &str) -> bool {
        !self.single_stocks.contains(ticker)
    }
}
