//! Driver performance prediction engine
//!
//! `PerformancePredictor` owns one scaler and one regressor and moves
//! between two states: untrained and trained. Only a successful `train`
//! enters the trained state; a failed `train` always leaves it untrained.
//!
//! A predictor is not meant to be trained from several threads at once;
//! callers that share one must serialize access (e.g. behind a `Mutex`).

mod features;
mod forest;
mod output;
mod scaler;
mod tree;

#[cfg(test)]
mod tests;

pub use features::{
    coerce_float, coerce_int, to_matrix, FeatureExtractor, DEFAULT_PRECIPITATION,
    DEFAULT_TEMPERATURE, FEATURE_NAMES, NUM_FEATURES,
};
pub use forest::{r2_score, ForestConfig, RandomForestRegressor, DEFAULT_N_ESTIMATORS, DEFAULT_SEED};
pub use output::{
    clamp_confidence, clamp_horizon, DEFAULT_PREDICTION_HOURS, MAX_PREDICTION_HOURS,
    MIN_PREDICTION_HOURS,
};
pub use scaler::StandardScaler;
pub use tree::{RegressionTree, TreeParams};

use crate::error::{
    FeatureError, NotTrainedError, PredictionError, RegressorError, ScalerError, TrainingError,
};
use crate::models::{fields, FeatureRanking, PerformanceRecord, Prediction};
use crate::observability::ForecastMetrics;
use chrono::{DateTime, FixedOffset, Local};
use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A trainable regression model
pub trait Regressor {
    /// Fit on a feature matrix and aligned targets
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), RegressorError>;

    /// Predict one value per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, RegressorError>;

    /// Goodness of fit (R²) of predictions on `x` against `y`
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64, RegressorError> {
        let predicted = self.predict(x)?;
        r2_score(y, &predicted)
    }

    /// Per-feature importance aligned to the training column order
    fn feature_importances(&self) -> Result<Array1<f64>, RegressorError>;
}

/// A feature scaler fit at training time and reused at inference time
pub trait Scaler {
    /// Learn scaling parameters from `x` and return the scaled matrix
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError>;

    /// Scale `x` with previously learned parameters; fails if never fit
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError>;
}

/// Training state of a predictor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Untrained,
    Trained { target_metric: String, samples: usize },
}

/// Forecasts a driver performance metric hour by hour
#[derive(Debug)]
pub struct PerformancePredictor<R = RandomForestRegressor, S = StandardScaler> {
    regressor: R,
    scaler: S,
    extractor: FeatureExtractor,
    state: ModelState,
    metrics: ForecastMetrics,
}

impl Default for PerformancePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformancePredictor {
    /// Random forest (100 trees, seed 42) over standardized features
    pub fn new() -> Self {
        Self::with_forest_config(ForestConfig::default())
    }

    pub fn with_forest_config(config: ForestConfig) -> Self {
        Self::with_components(RandomForestRegressor::new(config), StandardScaler::new())
    }
}

impl<R: Regressor, S: Scaler> PerformancePredictor<R, S> {
    pub fn with_components(regressor: R, scaler: S) -> Self {
        Self {
            regressor,
            scaler,
            extractor: FeatureExtractor::new(),
            state: ModelState::Untrained,
            metrics: ForecastMetrics::new(),
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained { .. })
    }

    /// Metric the model was last trained on
    pub fn target_metric(&self) -> Option<&str> {
        match &self.state {
            ModelState::Trained { target_metric, .. } => Some(target_metric),
            ModelState::Untrained => None,
        }
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    pub fn scaler(&self) -> &S {
        &self.scaler
    }

    /// Prepare the feature matrix for a batch of records
    pub fn prepare_features(
        &self,
        records: &[PerformanceRecord],
    ) -> Result<Array2<f64>, FeatureError> {
        self.extractor.prepare(records)
    }

    /// Train on historical records, predicting `target_metric`.
    ///
    /// On any failure the predictor is left untrained.
    pub fn train(
        &mut self,
        historical_data: &[PerformanceRecord],
        target_metric: &str,
    ) -> Result<(), TrainingError> {
        let start = Instant::now();
        self.state = ModelState::Untrained;

        match self.fit_all(historical_data, target_metric) {
            Ok(()) => {
                self.state = ModelState::Trained {
                    target_metric: target_metric.to_string(),
                    samples: historical_data.len(),
                };
                let elapsed = start.elapsed();
                self.metrics
                    .record_training(elapsed.as_secs_f64(), historical_data.len());
                info!(
                    target_metric = %target_metric,
                    samples = historical_data.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Model trained"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.inc_training_failures();
                warn!(target_metric = %target_metric, error = %e, "Training failed");
                Err(e)
            }
        }
    }

    fn fit_all(
        &mut self,
        historical_data: &[PerformanceRecord],
        target_metric: &str,
    ) -> Result<(), TrainingError> {
        if historical_data.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        let x = self
            .extractor
            .prepare(historical_data)
            .map_err(TrainingError::Features)?;
        let y = historical_data
            .iter()
            .map(|r| coerce_float(r, target_metric, 0.0))
            .collect::<Result<Array1<f64>, _>>()
            .map_err(TrainingError::Target)?;

        if x.nrows() != y.len() {
            return Err(TrainingError::LengthMismatch {
                features: x.nrows(),
                targets: y.len(),
            });
        }

        let x_scaled = self.scaler.fit_transform(&x)?;
        self.regressor.fit(&x_scaled, &y)?;
        Ok(())
    }

    /// Forecast `prediction_hours` hourly values starting now (local time).
    ///
    /// The horizon is clamped to `[1, 168]`.
    pub fn predict(
        &self,
        current_data: &PerformanceRecord,
        prediction_hours: i64,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.predict_from(current_data, prediction_hours, Local::now().fixed_offset())
    }

    /// Forecast hourly values starting at `anchor`.
    ///
    /// Hour `h` is forecast for `anchor + h hours`; only the time-derived
    /// features change between hours.
    pub fn predict_from(
        &self,
        current_data: &PerformanceRecord,
        prediction_hours: i64,
        anchor: DateTime<FixedOffset>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let start = Instant::now();
        let result = self.forecast(current_data, prediction_hours, anchor);
        match &result {
            Ok(predictions) => {
                self.metrics.record_forecast(start.elapsed().as_secs_f64());
                debug!(
                    hours = predictions.len(),
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Forecast completed"
                );
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                warn!(error = %e, "Prediction failed");
            }
        }
        result
    }

    fn forecast(
        &self,
        current_data: &PerformanceRecord,
        prediction_hours: i64,
        anchor: DateTime<FixedOffset>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.ensure_trained("making predictions")?;
        let hours = clamp_horizon(prediction_hours);
        let confidence = self.confidence(current_data)?;

        let times = output::forecast_times(anchor, hours);
        let vectors = times
            .iter()
            .map(|t| self.extractor.extract_at(current_data, t))
            .collect::<Result<Vec<_>, _>>()?;
        let scaled = self.scaler.transform(&to_matrix(&vectors)?)?;
        let values = self.regressor.predict(&scaled)?;

        Ok(times
            .iter()
            .zip(values.iter())
            .map(|(t, v)| output::format_prediction(t, *v, confidence))
            .collect())
    }

    /// Fit quality of the model on the current record against its own rating,
    /// bounded to [0, 1]. The same value applies to every forecast hour.
    ///
    /// R² over one sample is undefined, so this resolves to 1.0 unless a
    /// regressor overrides `score`.
    fn confidence(&self, current_data: &PerformanceRecord) -> Result<f64, PredictionError> {
        let x = self.extractor.prepare(std::slice::from_ref(current_data))?;
        let x_scaled = self.scaler.transform(&x)?;
        let rating = coerce_float(current_data, fields::RATING, 0.0)?;
        let raw = self.regressor.score(&x_scaled, &Array1::from(vec![rating]))?;
        Ok(clamp_confidence(raw))
    }

    /// Features ranked by their contribution to the trained model
    pub fn feature_importance(&self) -> Result<FeatureRanking, NotTrainedError> {
        self.ensure_trained("getting feature importance")?;
        let scores = self.regressor.feature_importances().map_err(|e| {
            warn!(error = %e, "Regressor failed to report feature importances");
            NotTrainedError {
                operation: "getting feature importance",
            }
        })?;
        Ok(FeatureRanking::from_scores(
            FEATURE_NAMES.iter().copied().zip(scores.iter().copied()),
        ))
    }

    fn ensure_trained(&self, operation: &'static str) -> Result<(), NotTrainedError> {
        if self.is_trained() {
            Ok(())
        } else {
            Err(NotTrainedError { operation })
        }
    }
}
