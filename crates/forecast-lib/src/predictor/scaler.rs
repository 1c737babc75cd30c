//! Standard (z-score) feature scaling
//!
//! Wraps smartcore's `StandardScaler`. Statistics are learned once on the
//! training matrix and reused unchanged at inference time. Columns that are
//! constant in training are only centered, so they map to zero instead of
//! dividing by a zero deviation.

use super::Scaler;
use crate::error::ScalerError;
use ndarray::Array2;
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{self, StandardScalerParameters};

struct FittedScaler {
    inner: numerical::StandardScaler<f64>,
    /// Training value of each constant column, `None` for varying columns
    constants: Vec<Option<f64>>,
}

/// Removes the mean and scales each feature to unit variance
#[derive(Default)]
pub struct StandardScaler {
    fitted: Option<FittedScaler>,
}

impl std::fmt::Debug for StandardScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardScaler")
            .field("fitted", &self.is_fitted())
            .field("n_features", &self.n_features())
            .finish()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { fitted: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Width of the training matrix, if fitted
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.constants.len())
    }

    fn scale(fitted: &FittedScaler, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        let scaled = fitted
            .inner
            .transform(&to_dense(x))
            .map_err(|e| ScalerError::Backend(e.to_string()))?;
        Ok(Array2::from_shape_fn(x.dim(), |(i, j)| {
            match fitted.constants[j] {
                Some(c) => x[[i, j]] - c,
                None => *scaled.get((i, j)),
            }
        }))
    }
}

impl Scaler for StandardScaler {
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        self.fitted = None;
        if x.nrows() == 0 {
            return Err(ScalerError::EmptyData);
        }

        let inner = numerical::StandardScaler::fit(&to_dense(x), StandardScalerParameters::default())
            .map_err(|e| ScalerError::Backend(e.to_string()))?;
        let constants = x
            .columns()
            .into_iter()
            .map(|col| {
                let first = col[0];
                col.iter().all(|v| *v == first).then_some(first)
            })
            .collect();

        let fitted = self.fitted.insert(FittedScaler { inner, constants });
        Self::scale(fitted, x)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        let fitted = self.fitted.as_ref().ok_or(ScalerError::NotFitted)?;
        if x.ncols() != fitted.constants.len() {
            return Err(ScalerError::FeatureMismatch {
                expected: fitted.constants.len(),
                got: x.ncols(),
            });
        }
        Self::scale(fitted, x)
    }
}

fn to_dense(x: &Array2<f64>) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
}
