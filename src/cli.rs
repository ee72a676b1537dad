//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fundamentals_csv_adapter::FundamentalsCsvAdapter;
use crate::adapters::stock_data_adapter::StockDataAdapter;
use crate::domain::error::TradestoreError;
use crate::domain::report::StageReport;
use crate::domain::settings::{load_settings, PriceProvider, Settings};
use crate::pipeline;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "tradestore", about = "Signal consolidation, classification and position reconciliation")]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild all_signals from the newest dated strategy files
    Consolidate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Rebuild the potential entry and exit lists
    Classify {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Update monitored and bought positions from all_signals
    Reconcile {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Consolidate, classify and reconcile in order
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the global fmt subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Consolidate { config } => run_stage(&config, |settings| {
            let fundamentals = FundamentalsCsvAdapter::load(&settings.paths.fundamentals_file)?;
            pipeline::consolidate_signals(settings, &fundamentals)
        }),
        Command::Classify { config } => run_stage(&config, |settings| {
            let quotes = build_quote_port(settings)?;
            pipeline::classify_signals(settings, quotes.as_ref())
        }),
        Command::Reconcile { config } => run_stage(&config, |settings| {
            let quotes = build_quote_port(settings)?;
            pipeline::reconcile_positions(settings, quotes.as_ref())
        }),
        Command::Run { config } => run_all(&config),
    }
}

pub fn load_config(path: &Path) -> Result<Settings, TradestoreError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    load_settings(&adapter)
}

/// The quote adapter selected by `[prices] provider`.
pub fn build_quote_port(settings: &Settings) -> Result<Box<dyn QuotePort>, TradestoreError> {
    match settings.prices.provider {
        PriceProvider::StockData => Ok(Box::new(StockDataAdapter::new(
            settings.paths.stock_data_dir.clone(),
        ))),
        #[cfg(feature = "yahoo")]
        PriceProvider::Yahoo => Ok(Box::new(
            crate::adapters::yahoo_adapter::YahooAdapter::new(settings.prices.timeout)?,
        )),
        #[cfg(not(feature = "yahoo"))]
        PriceProvider::Yahoo => Err(TradestoreError::config_invalid(
            "prices",
            "provider",
            "built without the yahoo feature",
        )),
    }
}

fn run_stage(
    config_path: &Path,
    stage: impl FnOnce(&Settings) -> Result<StageReport, TradestoreError>,
) -> ExitCode {
    let settings = match load_config(config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match stage(&settings) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_all(config_path: &Path) -> ExitCode {
    let settings = match load_config(config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let fundamentals = match FundamentalsCsvAdapter::load(&settings.paths.fundamentals_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let quotes = match build_quote_port(&settings) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let outcome = pipeline::run_all(&settings, &fundamentals, quotes.as_ref());
    for (stage, result) in &outcome.stages {
        match result {
            Ok(report) => println!("{report}"),
            Err(e) => eprintln!("error: {stage}: {e}"),
        }
    }

    match outcome.first_error() {
        Some(e) => e.into(),
        None => ExitCode::SUCCESS,
    }
}
