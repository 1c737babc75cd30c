//! Driver performance forecasting library
//!
//! This crate provides the core functionality for:
//! - Turning loosely typed performance records into numeric feature vectors
//! - Training a random forest on historical records for one target metric
//! - Hour-by-hour forecasts with a confidence score
//! - Feature importance rankings and the multi-metric dashboard report
//! - Prometheus metrics and structured logging of forecasting events

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod report;

pub use config::ForecastConfig;
pub use error::{
    FeatureError, NotTrainedError, PredictionError, RegressorError, ReportError, ScalerError,
    TrainingError,
};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use predictor::{ModelState, PerformancePredictor};
pub use report::{generate_report, generate_report_at, PerformanceReport, REPORT_METRICS};
