use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use folio_drift::core::allocation::AllocationLevel;
use folio_drift::core::holdings::GroupBy;
use folio_drift::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Grouping {
    Ticker,
    AssetClass,
}

impl From<Grouping> for AllocationLevel {
    fn from(grouping: Grouping) -> Self {
        match grouping {
            Grouping::Ticker => AllocationLevel::Ticker,
            Grouping::AssetClass => AllocationLevel::AssetClass,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Breakdown {
    Account,
    AssetClass,
    Ticker,
}

impl From<Breakdown> for GroupBy {
    fn from(breakdown: Breakdown) -> Self {
        match breakdown {
            Breakdown::Account => GroupBy::Account,
            Breakdown::AssetClass => GroupBy::AssetClass,
            Breakdown::Ticker => GroupBy::Ticker,
        }
    }
}

impl From<Commands> for folio_drift::AppCommand {
    fn from(cmd: Commands) -> folio_drift::AppCommand {
        match cmd {
            Commands::Validate => folio_drift::AppCommand::Validate,
            Commands::Targets => folio_drift::AppCommand::Targets,
            Commands::Drift {
                by,
                cash,
                core_only,
            } => folio_drift::AppCommand::Drift {
                level: by.into(),
                cash_to_invest: cash,
                core_only,
            },
            Commands::Summary { by, core_only } => folio_drift::AppCommand::Summary {
                group_by: by.into(),
                core_only,
            },
            Commands::Export { output } => folio_drift::AppCommand::Export { output },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Check that every node's children sum to 1.0
    Validate,
    /// Display target weights per asset class and ticker
    Targets,
    /// Compare current holdings with the target allocation
    Drift {
        /// Granularity of the comparison
        #[arg(long, value_enum, default_value = "ticker")]
        by: Grouping,
        /// New money to invest, overrides the configured amount
        #[arg(long)]
        cash: Option<f64>,
        /// Leave single stocks out of the comparison
        #[arg(long)]
        core_only: bool,
    },
    /// Display portfolio totals and a breakdown of holdings
    Summary {
        /// Field the holdings are grouped by
        #[arg(long, value_enum, default_value = "account")]
        by: Breakdown,
        /// Leave single stocks out of the breakdown
        #[arg(long)]
        core_only: bool,
    },
    /// Write priced holdings aggregated per account, asset class and ticker
    Export {
        /// Destination CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => folio_drift::cli::setup::setup(),
        Some(cmd) => folio_drift::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
