//! Observability infrastructure for the forecaster
//!
//! Provides:
//! - Prometheus metrics (training/prediction latency, outcome counters)
//! - Structured logging of forecasting events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds; forest fits on large histories can take seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    training_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    trainings: IntCounter,
    training_failures: IntCounter,
    forecasts_generated: IntCounter,
    prediction_errors: IntCounter,
    training_samples: IntGauge,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            training_latency_seconds: register_histogram!(
                "driver_forecast_training_latency_seconds",
                "Time spent vectorizing, scaling and fitting the model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register training_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "driver_forecast_prediction_latency_seconds",
                "Time spent producing one hourly forecast series",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            trainings: register_int_counter!(
                "driver_forecast_trainings_total",
                "Total number of successful training runs"
            )
            .expect("Failed to register trainings"),

            training_failures: register_int_counter!(
                "driver_forecast_training_failures_total",
                "Total number of failed training runs"
            )
            .expect("Failed to register training_failures"),

            forecasts_generated: register_int_counter!(
                "driver_forecast_forecasts_generated_total",
                "Total number of forecast series generated"
            )
            .expect("Failed to register forecasts_generated"),

            prediction_errors: register_int_counter!(
                "driver_forecast_prediction_errors_total",
                "Total number of failed prediction calls"
            )
            .expect("Failed to register prediction_errors"),

            training_samples: register_int_gauge!(
                "driver_forecast_training_samples",
                "Number of records used by the most recent successful training"
            )
            .expect("Failed to register training_samples"),
        }
    }
}

/// Forecaster metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastMetrics").finish_non_exhaustive()
    }
}

impl ForecastMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new)
    }

    /// Record a successful training run
    pub fn record_training(&self, duration_secs: f64, samples: usize) {
        let inner = self.inner();
        inner.training_latency_seconds.observe(duration_secs);
        inner.trainings.inc();
        inner.training_samples.set(samples as i64);
    }

    pub fn inc_training_failures(&self) {
        self.inner().training_failures.inc();
    }

    /// Record a generated forecast series
    pub fn record_forecast(&self, duration_secs: f64) {
        let inner = self.inner();
        inner.prediction_latency_seconds.observe(duration_secs);
        inner.forecasts_generated.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn trainings_total(&self) -> u64 {
        self.inner().trainings.get()
    }

    pub fn training_failures_total(&self) -> u64 {
        self.inner().training_failures.get()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> String {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for forecasting events
///
/// Provides consistent field names for training, forecast and report events
/// so downstream log processing can key on `event`.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "cli_started",
            source = %self.source,
            version = %version,
            "Driver forecast started"
        );
    }

    pub fn log_training_completed(&self, target_metric: &str, samples: usize, duration_ms: u128) {
        info!(
            event = "training_completed",
            source = %self.source,
            target_metric = %target_metric,
            samples = samples,
            duration_ms = duration_ms as u64,
            "Model trained"
        );
    }

    pub fn log_training_failed(&self, target_metric: &str, reason: &str) {
        warn!(
            event = "training_failed",
            source = %self.source,
            target_metric = %target_metric,
            reason = %reason,
            "Model training failed, model left untrained"
        );
    }

    pub fn log_forecast(&self, target_metric: &str, hours: usize, confidence: f64) {
        info!(
            event = "forecast_generated",
            source = %self.source,
            target_metric = %target_metric,
            hours = hours,
            confidence = confidence,
            "Generated hourly forecast"
        );
    }

    pub fn log_report(&self, metrics: &[&str], hours: usize, history_len: usize) {
        info!(
            event = "report_generated",
            source = %self.source,
            metrics = ?metrics,
            hours = hours,
            history_len = history_len,
            "Generated performance report"
        );
    }
}
