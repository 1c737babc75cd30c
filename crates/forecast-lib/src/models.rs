//! Core data models for driver performance forecasting

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Field names used in incoming performance records
pub mod fields {
    pub const RATING: &str = "rating";
    pub const COMPLETED_TRIPS: &str = "completedTrips";
    pub const ON_TIME_PERCENTAGE: &str = "onTimePercentage";
    pub const TOTAL_POINTS: &str = "totalPoints";
    pub const CURRENT_STREAK: &str = "currentStreak";
    pub const HOUR_OF_DAY: &str = "hour_of_day";
    pub const DAY_OF_WEEK: &str = "day_of_week";
    pub const MONTH: &str = "month";
    pub const TEMPERATURE: &str = "temperature";
    pub const PRECIPITATION: &str = "precipitation";
}

/// A single historical or current performance observation.
///
/// Records arrive as loosely typed JSON objects; every field is optional and
/// values may be numbers, numeric strings or booleans. Coercion into numbers
/// happens in the feature vectorizer, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceRecord(Map<String, Value>);

impl PerformanceRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style setter
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PerformanceRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Numeric feature vector for model input.
///
/// Field order matches [`crate::predictor::FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub rating: f64,
    pub completed_trips: f64,
    pub ontime_percentage: f64,
    pub total_points: f64,
    pub current_streak: f64,
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub month: f64,
    pub temperature: f64,
    pub precipitation: f64,
}

impl FeatureVector {
    /// Values in the fixed feature order
    pub fn values(&self) -> Vec<f64> {
        vec![
            self.rating,
            self.completed_trips,
            self.ontime_percentage,
            self.total_points,
            self.current_streak,
            self.hour_of_day,
            self.day_of_week,
            self.month,
            self.temperature,
            self.precipitation,
        ]
    }
}

/// One hourly forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// RFC 3339 timestamp of the forecast hour
    pub timestamp: String,
    pub predicted_value: f64,
    /// Model fit quality in [0, 1]
    pub confidence: f64,
}

/// Importance score for a single named feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Feature importances ordered by descending score.
///
/// Serializes as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRanking(Vec<FeatureImportance>);

impl FeatureRanking {
    /// Rank `(name, score)` pairs, highest score first. Equal scores keep
    /// their input order.
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut entries: Vec<FeatureImportance> = scores
            .into_iter()
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.to_string(),
                importance,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self(entries)
    }

    pub fn entries(&self) -> &[FeatureImportance] {
        &self.0
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| e.importance)
    }

    /// Position of a feature in the ranking (0 = most important)
    pub fn rank_of(&self, feature: &str) -> Option<usize> {
        self.0.iter().position(|e| e.feature == feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FeatureRanking {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.feature, &entry.importance)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = PerformanceRecord::new()
            .with(fields::RATING, 4.8)
            .with(fields::COMPLETED_TRIPS, 12);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(fields::RATING), Some(&Value::from(4.8)));
        assert!(record.get(fields::TEMPERATURE).is_none());
    }

    #[test]
    fn test_record_deserializes_from_object() {
        let record: PerformanceRecord =
            serde_json::from_str(r#"{"rating": 4.5, "completedTrips": "7"}"#).unwrap();
        assert_eq!(record.get("completedTrips"), Some(&Value::from("7")));
    }

    #[test]
    fn test_ranking_sorted_descending_and_stable() {
        let ranking = FeatureRanking::from_scores([("a", 0.1), ("b", 0.5), ("c", 0.1), ("d", 0.3)]);
        let order: Vec<&str> = ranking.entries().iter().map(|e| e.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
        assert_eq!(ranking.rank_of("c"), Some(3));
    }

    #[test]
    fn test_ranking_serializes_in_order() {
        let ranking = FeatureRanking::from_scores([("low", 0.2), ("high", 0.8)]);
        let json = serde_json::to_string(&ranking).unwrap();
        assert_eq!(json, r#"{"high":0.8,"low":0.2}"#);
    }
}
