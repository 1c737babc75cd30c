//! Scenario tests for training, forecasting and importance reporting
//!
//! Use small synthetic histories and test doubles for the regressor and
//! scaler seams.

#[cfg(test)]
mod predictor_tests {
    use crate::error::{FeatureError, PredictionError, RegressorError, ScalerError, TrainingError};
    use crate::models::{fields, PerformanceRecord};
    use crate::observability::ForecastMetrics;
    use crate::predictor::{
        ForestConfig, ModelState, PerformancePredictor, Regressor, Scaler, StandardScaler,
        FEATURE_NAMES, NUM_FEATURES,
    };
    use chrono::{DateTime, FixedOffset, TimeZone};
    use ndarray::{Array1, Array2};
    use std::cell::RefCell;

    /// Rating rises linearly with hour of day; everything else is constant
    fn synthetic_history(n: usize) -> Vec<PerformanceRecord> {
        (0..n)
            .map(|i| {
                let hour = (i % 24) as i64;
                PerformanceRecord::new()
                    .with(fields::RATING, 3.0 + 0.08 * hour as f64)
                    .with(fields::COMPLETED_TRIPS, 40)
                    .with(fields::ON_TIME_PERCENTAGE, 92.0)
                    .with(fields::TOTAL_POINTS, 1500)
                    .with(fields::CURRENT_STREAK, 3)
                    .with(fields::HOUR_OF_DAY, hour)
                    .with(fields::DAY_OF_WEEK, 2)
                    .with(fields::MONTH, 5)
            })
            .collect()
    }

    fn current_record() -> PerformanceRecord {
        PerformanceRecord::new()
            .with(fields::RATING, 4.2)
            .with(fields::COMPLETED_TRIPS, 40)
            .with(fields::ON_TIME_PERCENTAGE, 92.0)
            .with(fields::TOTAL_POINTS, 1500)
            .with(fields::CURRENT_STREAK, 3)
            .with(fields::HOUR_OF_DAY, 15)
            .with(fields::DAY_OF_WEEK, 2)
            .with(fields::MONTH, 5)
    }

    fn anchor(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    fn trained_predictor() -> PerformancePredictor {
        let mut predictor = PerformancePredictor::with_forest_config(ForestConfig {
            n_estimators: 30,
            ..ForestConfig::default()
        });
        predictor.train(&synthetic_history(50), fields::RATING).unwrap();
        predictor
    }

    /// Regressor whose fit always fails
    struct FailingRegressor;

    impl Regressor for FailingRegressor {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<(), RegressorError> {
            Err(RegressorError::InvalidParameter("forced failure".to_string()))
        }

        fn predict(&self, _x: &Array2<f64>) -> Result<Array1<f64>, RegressorError> {
            Err(RegressorError::NotFitted)
        }

        fn feature_importances(&self) -> Result<Array1<f64>, RegressorError> {
            Err(RegressorError::NotFitted)
        }
    }

    /// Regressor that remembers the last matrix it was asked to predict
    /// and returns the first column
    #[derive(Default)]
    struct RecordingRegressor {
        fitted: bool,
        last_input: RefCell<Option<Array2<f64>>>,
    }

    impl Regressor for RecordingRegressor {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<(), RegressorError> {
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, RegressorError> {
            if !self.fitted {
                return Err(RegressorError::NotFitted);
            }
            *self.last_input.borrow_mut() = Some(x.clone());
            Ok(x.column(0).to_owned())
        }

        fn feature_importances(&self) -> Result<Array1<f64>, RegressorError> {
            Ok(Array1::from_iter((0..NUM_FEATURES).map(|i| i as f64)))
        }
    }

    /// Regressor that fits and predicts zeros but cannot rank features
    struct OpaqueRegressor;

    impl Regressor for OpaqueRegressor {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<(), RegressorError> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, RegressorError> {
            Ok(Array1::zeros(x.nrows()))
        }

        fn feature_importances(&self) -> Result<Array1<f64>, RegressorError> {
            Err(RegressorError::InvalidParameter(
                "importances unavailable".to_string(),
            ))
        }
    }

    /// Scaler that passes values through once fit
    #[derive(Default)]
    struct IdentityScaler {
        fitted: bool,
    }

    impl Scaler for IdentityScaler {
        fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
            self.fitted = true;
            Ok(x.clone())
        }

        fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
            if self.fitted {
                Ok(x.clone())
            } else {
                Err(ScalerError::NotFitted)
            }
        }
    }

    #[test]
    fn test_predict_before_train_fails() {
        let predictor = PerformancePredictor::new();
        let err = predictor.predict(&current_record(), 24).unwrap_err();
        assert!(matches!(err, PredictionError::NotTrained(_)));
    }

    #[test]
    fn test_importance_before_train_fails() {
        let predictor = PerformancePredictor::new();
        assert!(predictor.feature_importance().is_err());
    }

    #[test]
    fn test_train_on_empty_dataset_fails() {
        let mut predictor = PerformancePredictor::new();
        let err = predictor.train(&[], fields::RATING).unwrap_err();
        assert_eq!(err, TrainingError::EmptyDataset);
        assert_eq!(predictor.state(), &ModelState::Untrained);
    }

    #[test]
    fn test_train_sets_state() {
        let predictor = trained_predictor();
        assert!(predictor.is_trained());
        assert_eq!(predictor.target_metric(), Some("rating"));
        assert_eq!(
            predictor.state(),
            &ModelState::Trained {
                target_metric: "rating".to_string(),
                samples: 50
            }
        );
    }

    #[test]
    fn test_horizon_is_clamped() {
        let predictor = trained_predictor();
        let at = anchor(2024, 5, 14, 6);
        for (requested, expected) in [(0, 1), (1, 1), (24, 24), (168, 168), (500, 168)] {
            let forecast = predictor
                .predict_from(&current_record(), requested, at)
                .unwrap();
            assert_eq!(forecast.len(), expected, "requested {} hours", requested);
        }
    }

    #[test]
    fn test_predictions_finite_and_confidence_bounded() {
        let predictor = trained_predictor();
        let forecast = predictor.predict(&current_record(), 48).unwrap();
        assert_eq!(forecast.len(), 48);
        for p in &forecast {
            assert!(p.predicted_value.is_finite());
            assert!(p.confidence.is_finite());
            assert!((0.0..=1.0).contains(&p.confidence));
        }
    }

    #[test]
    fn test_confidence_of_single_record_fit_is_full() {
        let predictor = trained_predictor();
        let forecast = predictor
            .predict_from(&current_record(), 3, anchor(2024, 5, 14, 15))
            .unwrap();
        assert!(forecast.iter().all(|p| p.confidence == 1.0));

        let mut by_hour = PerformancePredictor::with_forest_config(ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        });
        by_hour
            .train(&synthetic_history(50), fields::HOUR_OF_DAY)
            .unwrap();
        let forecast = by_hour.predict(&current_record(), 3).unwrap();
        assert!(forecast.iter().all(|p| p.confidence == 1.0));
    }

    #[test]
    fn test_confidence_identical_across_hours() {
        let predictor = trained_predictor();
        let forecast = predictor
            .predict_from(&current_record(), 12, anchor(2024, 5, 14, 6))
            .unwrap();
        let first = forecast[0].confidence;
        assert!(forecast.iter().all(|p| p.confidence == first));
    }

    #[test]
    fn test_forecast_follows_hourly_pattern() {
        let predictor = trained_predictor();
        // Hours 0..=23 from midnight; the trained rating rises with the hour
        let forecast = predictor
            .predict_from(&current_record(), 24, anchor(2024, 5, 14, 0))
            .unwrap();
        assert!(forecast[23].predicted_value > forecast[0].predicted_value);
    }

    #[test]
    fn test_importance_ranks_hour_above_constant_features() {
        let predictor = trained_predictor();
        let ranking = predictor.feature_importance().unwrap();
        assert_eq!(ranking.len(), NUM_FEATURES);

        let hour_rank = ranking.rank_of("hour_of_day").unwrap();
        assert!(ranking.get("hour_of_day").unwrap() > 0.0);
        for constant in [
            "completed_trips",
            "ontime_percentage",
            "total_points",
            "current_streak",
            "day_of_week",
            "month",
            "temperature",
            "precipitation",
        ] {
            assert!(
                hour_rank < ranking.rank_of(constant).unwrap(),
                "hour_of_day should outrank {}",
                constant
            );
            assert_eq!(ranking.get(constant), Some(0.0));
        }
    }

    #[test]
    fn test_importance_failure_keeps_trained_state() {
        let mut predictor =
            PerformancePredictor::with_components(OpaqueRegressor, StandardScaler::new());
        predictor.train(&synthetic_history(6), fields::RATING).unwrap();

        let err = predictor.feature_importance().unwrap_err();
        assert_eq!(err.operation, "getting feature importance");
        assert!(predictor.is_trained());
        assert_eq!(
            predictor
                .predict_from(&current_record(), 2, anchor(2024, 5, 14, 6))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_importance_is_idempotent() {
        let predictor = trained_predictor();
        let first = predictor.feature_importance().unwrap();
        let second = predictor.feature_importance().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_importance_names_follow_feature_order() {
        let mut predictor =
            PerformancePredictor::with_components(RecordingRegressor::default(), IdentityScaler::default());
        predictor.train(&synthetic_history(5), fields::RATING).unwrap();
        let ranking = predictor.feature_importance().unwrap();
        // The double scores feature i as i, so the ranking is the reverse order
        let names: Vec<&str> = ranking.entries().iter().map(|e| e.feature.as_str()).collect();
        let mut expected: Vec<&str> = FEATURE_NAMES.to_vec();
        expected.reverse();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_repeated_predictions_are_consistent() {
        let predictor = trained_predictor();
        let first = predictor.predict(&current_record(), 3).unwrap();
        let second = predictor.predict(&current_record(), 3).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);

        for (a, b) in first.iter().zip(second.iter()) {
            let ta = DateTime::parse_from_rfc3339(&a.timestamp).unwrap();
            let tb = DateTime::parse_from_rfc3339(&b.timestamp).unwrap();
            assert!((tb - ta).num_milliseconds().abs() < 1000);
        }

        // Fixed anchor removes any hour-boundary race from the value check
        let at = anchor(2024, 5, 14, 9);
        let first = predictor.predict_from(&current_record(), 3, at).unwrap();
        let second = predictor.predict_from(&current_record(), 3, at).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timestamps_step_by_one_hour() {
        let predictor = trained_predictor();
        let forecast = predictor
            .predict_from(&current_record(), 4, anchor(2024, 5, 14, 22))
            .unwrap();
        let times: Vec<DateTime<FixedOffset>> = forecast
            .iter()
            .map(|p| DateTime::parse_from_rfc3339(&p.timestamp).unwrap())
            .collect();
        assert_eq!(times[0], anchor(2024, 5, 14, 22));
        assert_eq!(times[3], anchor(2024, 5, 15, 1));
    }

    #[test]
    fn test_only_time_features_vary_between_hours() {
        let mut predictor =
            PerformancePredictor::with_components(RecordingRegressor::default(), IdentityScaler::default());
        predictor.train(&synthetic_history(5), fields::RATING).unwrap();

        // Sunday 2023-12-31 23:00, crossing into Monday and a new year
        let forecast = predictor
            .predict_from(&current_record(), 2, anchor(2023, 12, 31, 23))
            .unwrap();
        assert_eq!(forecast.len(), 2);

        let input = predictor.regressor().last_input.borrow().clone().unwrap();
        assert_eq!(input.dim(), (2, NUM_FEATURES));
        let hour = 5;
        let day = 6;
        let month = 7;
        assert_eq!(input[[0, hour]], 23.0);
        assert_eq!(input[[0, day]], 6.0);
        assert_eq!(input[[0, month]], 12.0);
        assert_eq!(input[[1, hour]], 0.0);
        assert_eq!(input[[1, day]], 0.0);
        assert_eq!(input[[1, month]], 1.0);

        for col in [0, 1, 2, 3, 4, 8, 9] {
            assert_eq!(input[[0, col]], input[[1, col]], "column {} changed", col);
        }
        assert_eq!(input[[0, 8]], 20.0);
        assert_eq!(forecast[0].predicted_value, 4.2);
    }

    #[test]
    fn test_failed_fit_leaves_model_untrained() {
        let metrics = ForecastMetrics::new();
        let failures_before = metrics.training_failures_total();
        let mut predictor =
            PerformancePredictor::with_components(FailingRegressor, StandardScaler::new());
        let err = predictor
            .train(&synthetic_history(10), fields::RATING)
            .unwrap_err();
        assert!(matches!(err, TrainingError::Fitting(_)));
        assert!(err.to_string().contains("forced failure"));
        assert!(!predictor.is_trained());
        assert!(metrics.training_failures_total() > failures_before);
    }

    #[test]
    fn test_failed_retraining_discards_trained_state() {
        let mut predictor = trained_predictor();
        let mut history = synthetic_history(10);
        history[4].insert(fields::RATING, "five stars");

        let err = predictor.train(&history, fields::RATING).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::Features(FeatureError::Coercion { .. })
        ));
        assert!(!predictor.is_trained());
        assert!(matches!(
            predictor.predict(&current_record(), 24).unwrap_err(),
            PredictionError::NotTrained(_)
        ));
    }

    #[test]
    fn test_invalid_target_value_fails_training() {
        let mut predictor = PerformancePredictor::with_forest_config(ForestConfig {
            n_estimators: 5,
            ..ForestConfig::default()
        });
        let mut history = synthetic_history(10);
        history[2].insert("weeklyBonus", serde_json::json!({"amount": 5}));

        let err = predictor.train(&history, "weeklyBonus").unwrap_err();
        assert!(matches!(err, TrainingError::Target(_)));
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_missing_target_defaults_to_zero() {
        let mut predictor = PerformancePredictor::with_forest_config(ForestConfig {
            n_estimators: 5,
            ..ForestConfig::default()
        });
        predictor
            .train(&synthetic_history(10), "acceptanceRate")
            .unwrap();
        let forecast = predictor
            .predict_from(&current_record(), 2, anchor(2024, 5, 14, 6))
            .unwrap();
        assert!(forecast.iter().all(|p| p.predicted_value == 0.0));
    }

    #[test]
    fn test_malformed_current_record_fails_prediction() {
        let predictor = trained_predictor();
        let current = current_record().with(fields::TOTAL_POINTS, "lots");
        let err = predictor.predict(&current, 24).unwrap_err();
        assert!(matches!(err, PredictionError::Features(_)));
        assert!(err.to_string().starts_with("error making predictions"));
    }

    #[test]
    fn test_predict_does_not_change_state() {
        let predictor = trained_predictor();
        let before = predictor.state().clone();
        predictor.predict(&current_record(), 5).unwrap();
        predictor.feature_importance().unwrap();
        assert_eq!(predictor.state(), &before);
    }
}
