//! Forecasting configuration

use crate::predictor::{ForestConfig, DEFAULT_N_ESTIMATORS, DEFAULT_PREDICTION_HOURS, DEFAULT_SEED};
use serde::Deserialize;

/// Model and horizon settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastConfig {
    /// Number of trees in the forest
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Maximum tree depth; unset grows trees until leaves are pure
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,

    /// Random seed for bootstrap sampling and split search
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Forecast horizon in hours, clamped to [1, 168] at prediction time
    #[serde(default = "default_prediction_hours")]
    pub prediction_hours: i64,
}

fn default_n_estimators() -> usize {
    DEFAULT_N_ESTIMATORS
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_bootstrap() -> bool {
    true
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_prediction_hours() -> i64 {
    DEFAULT_PREDICTION_HOURS
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            bootstrap: default_bootstrap(),
            seed: default_seed(),
            prediction_hours: default_prediction_hours(),
        }
    }
}

impl ForecastConfig {
    /// Regressor hyperparameters
    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            bootstrap: self.bootstrap,
            seed: self.seed,
        }
    }
}
