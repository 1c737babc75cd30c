//! Configuration management for the CLI
//!
//! Settings come from an optional TOML file overlaid by `DRIVER_FORECAST_*`
//! environment variables. Anything left unset takes the library defaults.

use anyhow::{Context, Result};
use config::{Environment, File};
use forecast_lib::ForecastConfig;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `DRIVER_FORECAST_N_ESTIMATORS=50`
pub const ENV_PREFIX: &str = "DRIVER_FORECAST";

/// Load settings from `path` (required to exist when given) or the default
/// config file (optional), then the environment
pub fn load(path: Option<&Path>) -> Result<ForecastConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<ForecastConfig> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(File::from(path).required(true));
        }
        None => {
            if let Some(default_path) = default_config_path() {
                builder = builder.add_source(File::from(default_path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(env.try_parsing(true))
        .build()
        .context("Failed to load configuration")?;

    settings
        .try_deserialize()
        .context("Invalid forecast configuration")
}

/// Get the default configuration file path
fn default_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(
        home.join(".config")
            .join("driver-forecast")
            .join("config.toml"),
    )
}
