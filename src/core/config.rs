use crate::core::classify::Classifier;
use crate::core::taxonomy::{AllocationTree, Classification, TaxonomyConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Target allocation, weights relative to the parent node.
    pub allocation: TaxonomyConfig,
    /// Asset class → ticker lookup. Falls back to the allocation's shape.
    #[serde(default)]
    pub classification: Option<TaxonomyConfig>,
    /// Tickers held outside the core portfolio.
    #[serde(default)]
    pub single_stocks: Vec<String>,
    /// Normalized holdings CSV files.
    #[serde(default)]
    pub holdings: Vec<PathBuf>,
    #[serde(default)]
    pub cash_to_invest: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "folio-drift", "folio-drift")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }
}

/// The taxonomies of one session, built once from the config and then only
/// read.
#[derive(Debug, Clone)]
pub struct AllocationContext {
    pub allocation: AllocationTree,
    pub classifier: Classifier,
}

impl AllocationContext {
    pub fn from_config(config: &AppConfig) -> Self {
        let allocation = AllocationTree::from_config(&config.allocation);
        let single_stocks = config.single_stocks.iter().cloned();
        let classifier = match &config.classification {
            Some(taxonomy) => Classifier::new(Classification::from_config(taxonomy), single_stocks),
            None => Classifier::from_allocation(&allocation, single_stocks),
        };
        debug!(
            nodes = allocation.node_count(),
            classification_nodes = classifier.taxonomy().node_count(),
            "Built allocation context"
        );
        Self {
            allocation,
            classifier,
        }
    }
}
