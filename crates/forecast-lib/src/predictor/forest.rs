//! Random forest regressor
//!
//! Bagged ensemble of CART regression trees. Fitting is deterministic for a
//! given seed, so two forests fit on the same data predict identically.

use super::tree::{RegressionTree, TreeParams};
use super::Regressor;
use crate::error::RegressorError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smartcore::metrics;
use tracing::debug;

/// Default number of trees
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Hyperparameters for the random forest
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// Maximum tree depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Draw a bootstrap sample per tree instead of using every row
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<(), RegressorError> {
        if self.n_estimators == 0 {
            return Err(RegressorError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(RegressorError::InvalidParameter(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(RegressorError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone)]
struct FittedForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
    importances: Vec<f64>,
}

/// Random forest regression model
#[derive(Debug, Clone, Default)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    fitted: Option<FittedForest>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn n_trees(&self) -> usize {
        self.fitted.as_ref().map(|f| f.trees.len()).unwrap_or(0)
    }

    fn fitted(&self) -> Result<&FittedForest, RegressorError> {
        self.fitted.as_ref().ok_or(RegressorError::NotFitted)
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), RegressorError> {
        self.fitted = None;
        self.config.validate()?;
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(RegressorError::EmptyData);
        }
        if n_samples != y.len() {
            return Err(RegressorError::LengthMismatch {
                samples: n_samples,
                targets: y.len(),
            });
        }

        let params = self.config.tree_params();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let samples: Vec<usize> = if self.config.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());
            trees.push(RegressionTree::fit(
                x.view(),
                y.view(),
                samples,
                params,
                &mut tree_rng,
            ));
        }

        let importances = average_importances(&trees, n_features);
        debug!(
            n_trees = trees.len(),
            n_samples,
            n_features,
            "Random forest fitted"
        );

        self.fitted = Some(FittedForest {
            trees,
            n_features,
            importances,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, RegressorError> {
        let forest = self.fitted()?;
        if x.ncols() != forest.n_features {
            return Err(RegressorError::FeatureMismatch {
                expected: forest.n_features,
                got: x.ncols(),
            });
        }
        let n_trees = forest.trees.len() as f64;
        Ok(x.rows()
            .into_iter()
            .map(|row| forest.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn feature_importances(&self) -> Result<Array1<f64>, RegressorError> {
        Ok(Array1::from(self.fitted()?.importances.clone()))
    }
}

/// Mean of per-tree normalized importances, renormalized to sum to 1
fn average_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_features];
    for tree in trees {
        for (acc, imp) in sum.iter_mut().zip(tree.feature_importances()) {
            *acc += imp;
        }
    }
    let total: f64 = sum.iter().sum();
    if total > 0.0 {
        sum.iter_mut().for_each(|v| *v /= total);
    }
    sum
}

/// Coefficient of determination.
///
/// Fewer than two samples give NaN, since R² is undefined there. A constant
/// target with two or more samples scores 1.0 when predicted exactly and 0.0
/// otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, RegressorError> {
    if y_true.is_empty() {
        return Err(RegressorError::EmptyData);
    }
    if y_true.len() != y_pred.len() {
        return Err(RegressorError::LengthMismatch {
            samples: y_pred.len(),
            targets: y_true.len(),
        });
    }
    if y_true.len() < 2 {
        return Ok(f64::NAN);
    }
    if y_true.iter().all(|v| *v == y_true[0]) {
        return Ok(if y_true == y_pred { 1.0 } else { 0.0 });
    }
    Ok(metrics::r2(&y_true.to_vec(), &y_pred.to_vec()))
}
