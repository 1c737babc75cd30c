//! Forecast output shaping
//!
//! Horizon clamping, confidence bounding and timestamp formatting for
//! hourly predictions.

use crate::models::Prediction;
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};

/// Default forecast horizon in hours
pub const DEFAULT_PREDICTION_HOURS: i64 = 24;

/// Longest forecast horizon (one week of hourly points)
pub const MAX_PREDICTION_HOURS: i64 = 168;

/// Shortest forecast horizon
pub const MIN_PREDICTION_HOURS: i64 = 1;

/// Clamp a requested horizon into `[MIN_PREDICTION_HOURS, MAX_PREDICTION_HOURS]`
pub fn clamp_horizon(prediction_hours: i64) -> usize {
    prediction_hours.clamp(MIN_PREDICTION_HOURS, MAX_PREDICTION_HOURS) as usize
}

/// Bound a raw goodness-of-fit score to [0, 1].
///
/// An undefined (NaN) score, as a single-sample fit produces, maps to 1.0.
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        1.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Timestamps of each forecast hour, starting at the anchor itself
pub fn forecast_times(anchor: DateTime<FixedOffset>, hours: usize) -> Vec<DateTime<FixedOffset>> {
    (0..hours as i64)
        .map(|h| anchor + Duration::hours(h))
        .collect()
}

pub fn format_prediction(at: &DateTime<FixedOffset>, predicted_value: f64, confidence: f64) -> Prediction {
    Prediction {
        timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, false),
        predicted_value,
        confidence,
    }
}
