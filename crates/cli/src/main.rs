//! Driver performance forecasting CLI
//!
//! Trains on a JSON history of driver performance records and prints hourly
//! forecasts, feature importances or the multi-metric dashboard report.

mod config;
mod input;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecast_lib::{
    fields, generate_report, ForecastConfig, ForecastMetrics, PerformancePredictor,
    StructuredLogger,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Driver performance forecasting CLI
#[derive(Parser)]
#[command(name = "driver-forecast")]
#[command(author, version, about = "Forecast driver performance metrics", long_about = None)]
pub struct Cli {
    /// Settings file (TOML); defaults to ~/.config/driver-forecast/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    pub dump_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on history and forecast one metric hour by hour
    Forecast {
        /// JSON array of historical records
        #[arg(long)]
        history: PathBuf,

        /// JSON object with the driver's current record
        #[arg(long)]
        current: PathBuf,

        /// Metric to forecast
        #[arg(long, default_value = fields::RATING)]
        metric: String,

        /// Forecast horizon in hours (1-168); defaults to the configured horizon
        #[arg(long, allow_negative_numbers = true)]
        hours: Option<i64>,
    },

    /// Train on history and rank features by importance
    Importance {
        /// JSON array of historical records
        #[arg(long)]
        history: PathBuf,

        /// Metric to train on
        #[arg(long, default_value = fields::RATING)]
        metric: String,
    },

    /// Forecast rating, on-time percentage and total points together
    Report {
        /// JSON array of historical records
        #[arg(long)]
        history: PathBuf,

        /// JSON object with the driver's current record
        #[arg(long)]
        current: PathBuf,

        /// Forecast horizon in hours (1-168); defaults to the configured horizon
        #[arg(long, allow_negative_numbers = true)]
        hours: Option<i64>,
    },
}

fn init_tracing(verbose: bool, log_json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let logger = StructuredLogger::new("cli");
    logger.log_startup(CLI_VERSION);

    let settings = config::load(cli.config.as_deref())?;
    debug!(?settings, "Configuration loaded");

    let result = run(cli.command, &settings, cli.format, &logger);

    if cli.dump_metrics {
        eprint!("{}", ForecastMetrics::new().render());
    }

    result
}

fn run(
    command: Commands,
    settings: &ForecastConfig,
    format: output::OutputFormat,
    logger: &StructuredLogger,
) -> Result<()> {
    match command {
        Commands::Forecast {
            history,
            current,
            metric,
            hours,
        } => {
            let history = input::load_history(&history)?;
            let current = input::load_record(&current)?;
            let predictor = train(&history, &metric, settings, logger)?;

            let hours = hours.unwrap_or(settings.prediction_hours);
            let predictions = predictor
                .predict(&current, hours)
                .with_context(|| format!("Failed to forecast {}", metric))?;
            if let Some(first) = predictions.first() {
                logger.log_forecast(&metric, predictions.len(), first.confidence);
            }
            output::print_forecast(&metric, &predictions, format)
        }
        Commands::Importance { history, metric } => {
            let history = input::load_history(&history)?;
            let predictor = train(&history, &metric, settings, logger)?;
            let ranking = predictor
                .feature_importance()
                .context("Failed to compute feature importance")?;
            output::print_importance(&metric, &ranking, format)
        }
        Commands::Report {
            history,
            current,
            hours,
        } => {
            let history = input::load_history(&history)?;
            let current = input::load_record(&current)?;
            let hours = hours.unwrap_or(settings.prediction_hours);
            info!(records = history.len(), hours, "Generating report");
            let report = generate_report(&history, &current, hours, settings)
                .context("Failed to generate report")?;
            output::print_report(&report, format)
        }
    }
}

fn train(
    history: &[forecast_lib::PerformanceRecord],
    metric: &str,
    settings: &ForecastConfig,
    logger: &StructuredLogger,
) -> Result<PerformancePredictor> {
    let mut predictor = PerformancePredictor::with_forest_config(settings.forest_config());
    let start = Instant::now();
    match predictor.train(history, metric) {
        Ok(()) => {
            logger.log_training_completed(metric, history.len(), start.elapsed().as_millis());
            Ok(predictor)
        }
        Err(e) => {
            logger.log_training_failed(metric, &e.to_string());
            Err(e).with_context(|| format!("Failed to train {} model", metric))
        }
    }
}
