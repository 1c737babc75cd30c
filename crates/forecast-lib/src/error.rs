//! Error types for feature preparation, training and prediction
//!
//! Each public operation returns exactly one error type. Lower-level
//! failures are wrapped with the operation's context and keep the original
//! message as their source.

use thiserror::Error;

/// Malformed input while building feature vectors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("error preparing features: field `{field}` is not a valid {expected}: {value}")]
    Coercion {
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("error preparing features: feature vector length mismatch, expected {expected}, got {actual}")]
    Shape { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalerError {
    #[error("scaler is not fitted yet; call fit_transform before transform")]
    NotFitted,

    #[error("cannot fit scaler on empty data")]
    EmptyData,

    #[error("scaler feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("scaler failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressorError {
    #[error("regressor is not fitted yet")]
    NotFitted,

    #[error("cannot fit regressor on empty data")]
    EmptyData,

    #[error("regressor input has {samples} samples but {targets} targets")]
    LengthMismatch { samples: usize, targets: usize },

    #[error("regressor feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("invalid regressor parameter: {0}")]
    InvalidParameter(String),
}

/// Failure of the training sequence. The model is left untrained.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("error training model: no historical data provided for training")]
    EmptyDataset,

    #[error("error training model: feature and target arrays must have the same length ({features} vs {targets})")]
    LengthMismatch { features: usize, targets: usize },

    #[error("error training model: {0}")]
    Features(#[source] FeatureError),

    #[error("error training model: invalid target value: {0}")]
    Target(#[source] FeatureError),

    #[error("error training model: {0}")]
    Scaling(#[from] ScalerError),

    #[error("error training model: {0}")]
    Fitting(#[from] RegressorError),
}

/// An operation that requires a trained model was called on an untrained one
#[derive(Debug, Clone, PartialEq, Error)]
#[error("model needs to be trained before {operation}")]
pub struct NotTrainedError {
    pub operation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("error making predictions: {0}")]
    NotTrained(#[from] NotTrainedError),

    #[error("error making predictions: {0}")]
    Features(#[from] FeatureError),

    #[error("error making predictions: {0}")]
    Scaling(#[from] ScalerError),

    #[error("error making predictions: {0}")]
    Regressor(#[from] RegressorError),
}

/// Failure while assembling a multi-metric report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("metric `{metric}`: {source}")]
    Training {
        metric: &'static str,
        #[source]
        source: TrainingError,
    },

    #[error("metric `{metric}`: {source}")]
    Prediction {
        metric: &'static str,
        #[source]
        source: PredictionError,
    },

    #[error("metric `{metric}`: {source}")]
    Importance {
        metric: &'static str,
        #[source]
        source: NotTrainedError,
    },
}
