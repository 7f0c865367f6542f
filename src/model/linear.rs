//! Least-squares linear regression
//!
//! Fits ordinary and L2-regularized (ridge) models via the normal
//! equations. With at most a handful of feature columns, Gaussian
//! elimination on the normal matrix is plenty.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Fitted linear model: `y = intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit by ordinary least squares
    pub fn fit_ols(x: &[Vec<f64>], y: &[f64]) -> Result<Self, PipelineError> {
        Self::fit(x, y, 0.0)
    }

    /// Fit with L2 regularization of strength `alpha`
    pub fn fit_ridge(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self, PipelineError> {
        Self::fit(x, y, alpha)
    }

    fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self, PipelineError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::FitError(
                "empty or mismatched design matrix".to_string(),
            ));
        }
        let n_features = x[0].len();
        let dim = n_features + 1;

        // Normal equations over the intercept-augmented design matrix:
        // (X'X + alpha*I) w = X'y, with the intercept unpenalized
        let mut a = vec![vec![0.0; dim]; dim];
        let mut b = vec![0.0; dim];
        for (row, &target) in x.iter().zip(y) {
            let augmented: Vec<f64> = std::iter::once(1.0).chain(row.iter().copied()).collect();
            for i in 0..dim {
                b[i] += augmented[i] * target;
                for j in 0..dim {
                    a[i][j] += augmented[i] * augmented[j];
                }
            }
        }
        for (i, row) in a.iter_mut().enumerate().skip(1) {
            row[i] += alpha;
        }

        let weights = solve(a, b).ok_or_else(|| {
            PipelineError::FitError("singular normal matrix".to_string())
        })?;

        Ok(Self {
            intercept: weights[0],
            coefficients: weights[1..].to_vec(),
        })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, f)| c * f)
                .sum::<f64>()
    }
}

/// Solve `a · w = b` by Gaussian elimination with partial pivoting.
/// Returns `None` for a singular system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-10 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = vec![0.0; n];
    for row in (0..n).rev() {
        let upper: f64 = ((row + 1)..n).map(|k| a[row][k] * w[k]).sum();
        w[row] = (b[row] - upper) / a[row][row];
    }
    Some(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ols_recovers_exact_line() {
        // y = 2x + 1
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 + 1.0).collect();

        let model = LinearModel::fit_ols(&x, &y).unwrap();

        assert!((model.coefficients[0] - 2.0).abs() < 1e-8);
        assert!((model.intercept - 1.0).abs() < 1e-8);
        assert!((model.predict(&[20.0]) - 41.0).abs() < 1e-6);
    }

    #[test]
    fn test_ols_two_features() {
        // y = 3a - 2b + 5
        let x: Vec<Vec<f64>> = vec![
            vec![1.0, 2.0],
            vec![2.0, 1.0],
            vec![3.0, 3.0],
            vec![4.0, 0.5],
            vec![5.0, 2.5],
        ];
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 5.0).collect();

        let model = LinearModel::fit_ols(&x, &y).unwrap();

        assert!((model.coefficients[0] - 3.0).abs() < 1e-6);
        assert!((model.coefficients[1] + 2.0).abs() < 1e-6);
        assert!((model.intercept - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 - 4.5]).collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0]).collect();

        let ols = LinearModel::fit_ols(&x, &y).unwrap();
        let ridge = LinearModel::fit_ridge(&x, &y, 10.0).unwrap();

        assert!(ridge.coefficients[0].abs() < ols.coefficients[0].abs());
        assert!(ridge.coefficients[0] > 0.0);
    }

    #[test]
    fn test_singular_matrix_is_error() {
        // Two identical columns make X'X singular under OLS
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| i as f64).collect();

        assert!(LinearModel::fit_ols(&x, &y).is_err());
        // Ridge regularization restores solvability
        assert!(LinearModel::fit_ridge(&x, &y, 1.0).is_ok());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(LinearModel::fit_ols(&[], &[]).is_err());
    }
}
