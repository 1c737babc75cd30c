//! Multi-metric performance report
//!
//! Trains one independent predictor per dashboard metric over the same
//! history and forecasts each from the same anchor. Feature importance is
//! taken from the rating model.

use crate::config::ForecastConfig;
use crate::error::ReportError;
use crate::models::{fields, FeatureRanking, PerformanceRecord, Prediction};
use crate::observability::StructuredLogger;
use crate::predictor::{clamp_horizon, PerformancePredictor};
use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;

/// Metrics forecast in a report, in processing order
pub const REPORT_METRICS: [&str; 3] = [
    fields::RATING,
    fields::ON_TIME_PERCENTAGE,
    fields::TOTAL_POINTS,
];

/// Hourly forecasts per metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricForecasts {
    pub rating: Vec<Prediction>,
    pub on_time_percentage: Vec<Prediction>,
    pub total_points: Vec<Prediction>,
}

/// Dashboard payload: forecasts, rating-model importances and the history
/// the models were trained on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub predictions: MetricForecasts,
    pub feature_importance: FeatureRanking,
    pub historical_data: Vec<PerformanceRecord>,
}

/// Build a report forecasting from the local wall clock
pub fn generate_report(
    history: &[PerformanceRecord],
    current: &PerformanceRecord,
    prediction_hours: i64,
    config: &ForecastConfig,
) -> Result<PerformanceReport, ReportError> {
    generate_report_at(
        history,
        current,
        prediction_hours,
        config,
        Local::now().fixed_offset(),
    )
}

/// Build a report forecasting every metric from `anchor`
pub fn generate_report_at(
    history: &[PerformanceRecord],
    current: &PerformanceRecord,
    prediction_hours: i64,
    config: &ForecastConfig,
    anchor: DateTime<FixedOffset>,
) -> Result<PerformanceReport, ReportError> {
    let forecast_metric = |metric: &'static str| {
        let mut predictor = PerformancePredictor::with_forest_config(config.forest_config());
        predictor
            .train(history, metric)
            .map_err(|source| ReportError::Training { metric, source })?;
        let predictions = predictor
            .predict_from(current, prediction_hours, anchor)
            .map_err(|source| ReportError::Prediction { metric, source })?;
        Ok::<_, ReportError>((predictor, predictions))
    };

    let (rating_model, rating) = forecast_metric(fields::RATING)?;
    let feature_importance = rating_model
        .feature_importance()
        .map_err(|source| ReportError::Importance {
            metric: fields::RATING,
            source,
        })?;
    let (_, on_time_percentage) = forecast_metric(fields::ON_TIME_PERCENTAGE)?;
    let (_, total_points) = forecast_metric(fields::TOTAL_POINTS)?;

    StructuredLogger::new("report").log_report(
        &REPORT_METRICS,
        clamp_horizon(prediction_hours),
        history.len(),
    );

    Ok(PerformanceReport {
        predictions: MetricForecasts {
            rating,
            on_time_percentage,
            total_points,
        },
        feature_importance,
        historical_data: history.to_vec(),
    })
}
