//! Feature extraction for model training and inference
//!
//! Converts loosely typed performance records into fixed-width numeric
//! feature rows. Missing fields take their defaults; values that cannot be
//! coerced to numbers are rejected rather than silently zeroed.

use crate::error::FeatureError;
use crate::models::{fields, FeatureVector, PerformanceRecord};
use chrono::{DateTime, Datelike, TimeZone, Timelike};
use ndarray::Array2;
use serde_json::Value;

/// Fixed feature order shared by vectorization, scaling and importance reporting
pub const FEATURE_NAMES: [&str; 10] = [
    "rating",
    "completed_trips",
    "ontime_percentage",
    "total_points",
    "current_streak",
    "hour_of_day",
    "day_of_week",
    "month",
    "temperature",
    "precipitation",
];

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

/// Default temperature (°C) when a record carries no weather data
pub const DEFAULT_TEMPERATURE: f64 = 20.0;

/// Default precipitation when a record carries no weather data
pub const DEFAULT_PRECIPITATION: f64 = 0.0;

/// Extracts feature vectors from performance records
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature vector for a single record
    pub fn extract(&self, record: &PerformanceRecord) -> Result<FeatureVector, FeatureError> {
        let mut vector = self.extract_static(record)?;
        vector.hour_of_day = coerce_int(record, fields::HOUR_OF_DAY)?;
        vector.day_of_week = coerce_int(record, fields::DAY_OF_WEEK)?;
        vector.month = coerce_int(record, fields::MONTH)?;
        Ok(vector)
    }

    /// Build the feature vector for a record observed at `at`.
    ///
    /// Time-derived fields come from the timestamp (weekday 0 = Monday);
    /// every other field comes from the record.
    pub fn extract_at<Tz: TimeZone>(
        &self,
        record: &PerformanceRecord,
        at: &DateTime<Tz>,
    ) -> Result<FeatureVector, FeatureError> {
        let mut vector = self.extract_static(record)?;
        vector.hour_of_day = at.hour() as f64;
        vector.day_of_week = at.weekday().num_days_from_monday() as f64;
        vector.month = at.month() as f64;
        Ok(vector)
    }

    /// Prepare a feature matrix of shape `(records.len(), NUM_FEATURES)`
    pub fn prepare(&self, records: &[PerformanceRecord]) -> Result<Array2<f64>, FeatureError> {
        let vectors = records
            .iter()
            .map(|r| self.extract(r))
            .collect::<Result<Vec<_>, _>>()?;
        to_matrix(&vectors)
    }

    /// Non-time fields of a record; time fields are left at zero
    fn extract_static(&self, record: &PerformanceRecord) -> Result<FeatureVector, FeatureError> {
        Ok(FeatureVector {
            rating: coerce_float(record, fields::RATING, 0.0)?,
            completed_trips: coerce_int(record, fields::COMPLETED_TRIPS)?,
            ontime_percentage: coerce_float(record, fields::ON_TIME_PERCENTAGE, 0.0)?,
            total_points: coerce_int(record, fields::TOTAL_POINTS)?,
            current_streak: coerce_int(record, fields::CURRENT_STREAK)?,
            hour_of_day: 0.0,
            day_of_week: 0.0,
            month: 0.0,
            temperature: coerce_float(record, fields::TEMPERATURE, DEFAULT_TEMPERATURE)?,
            precipitation: coerce_float(record, fields::PRECIPITATION, DEFAULT_PRECIPITATION)?,
        })
    }
}

/// Stack feature vectors into a matrix, checking every row's width
pub fn to_matrix(vectors: &[FeatureVector]) -> Result<Array2<f64>, FeatureError> {
    let mut data = Vec::with_capacity(vectors.len() * NUM_FEATURES);
    for vector in vectors {
        let row = vector.values();
        if row.len() != NUM_FEATURES {
            return Err(FeatureError::Shape {
                expected: NUM_FEATURES,
                actual: row.len(),
            });
        }
        data.extend(row);
    }
    Array2::from_shape_vec((vectors.len(), NUM_FEATURES), data).map_err(|_| FeatureError::Shape {
        expected: NUM_FEATURES,
        actual: vectors.first().map(|v| v.values().len()).unwrap_or(0),
    })
}

/// Read a field as a finite float, using `default` when absent
pub fn coerce_float(
    record: &PerformanceRecord,
    field: &str,
    default: f64,
) -> Result<f64, FeatureError> {
    let value = match record.get(field) {
        None => return Ok(default),
        Some(v) => v,
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(coercion_error(field, "number", value)),
    }
}

/// Read a field as an integer, using 0 when absent.
///
/// Fractional numbers are truncated toward zero; numeric strings must be
/// integral. Integers are not bounded to 64 bits, and the result is the
/// nearest `f64`.
pub fn coerce_int(record: &PerformanceRecord, field: &str) -> Result<f64, FeatureError> {
    let value = match record.get(field) {
        None => return Ok(0.0),
        Some(v) => v,
    };
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i as f64)
            .or_else(|| n.as_u64().map(|u| u as f64))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(f64::trunc)),
        Value::String(s) => s.trim().parse::<i128>().ok().map(|i| i as f64),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    };
    parsed.ok_or_else(|| coercion_error(field, "integer", value))
}

fn coercion_error(field: &str, expected: &'static str, value: &Value) -> FeatureError {
    FeatureError::Coercion {
        field: field.to_string(),
        expected,
        value: value.to_string(),
    }
}
