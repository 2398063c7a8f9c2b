pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::drift::DriftOptions;
use crate::cli::summary::SummaryOptions;
use crate::core::allocation::AllocationLevel;
use crate::core::cache::Cache;
use crate::core::config::{AllocationContext, AppConfig};
use crate::core::holdings::GroupBy;
use crate::core::price::PriceResult;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Validate,
    Targets,
    Drift {
        level: AllocationLevel,
        cash_to_invest: Option<f64>,
        core_only: bool,
    },
    Summary {
        group_by: GroupBy,
        core_only: bool,
    },
    Export {
        output: PathBuf,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Folio drift starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let context = AllocationContext::from_config(&config);

    let price_cache = Arc::new(Cache::<String, PriceResult>::new());
    let price_provider =
        providers::yahoo_finance::YahooFinanceProvider::new(config.yahoo_base_url(), price_cache);

    match command {
        AppCommand::Validate => cli::validate::run(&context.allocation),
        AppCommand::Targets => cli::targets::run(&context.allocation),
        AppCommand::Drift {
            level,
            cash_to_invest,
            core_only,
        } => {
            let options = DriftOptions {
                level,
                cash_to_invest,
                core_only,
            };
            cli::drift::run(&config, &context, &price_provider, options).await
        }
        AppCommand::Summary {
            group_by,
            core_only,
        } => {
            let options = SummaryOptions {
                group_by,
                core_only,
            };
            cli::summary::run(&config, &context, &price_provider, options).await
        }
        AppCommand::Export { output } => {
            cli::export::run(&config, &context, &price_provider, &output).await
        }
    }
}
