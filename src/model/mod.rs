//! Regression models and feature scaling
//!
//! All learned parameters are plain serializable data so trained models can
//! round-trip through the model store unchanged.

mod forest;
mod linear;

pub use forest::{RandomForest, FOREST_SEED, FOREST_TREES};
pub use linear::LinearModel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Metric;

/// Candidate model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Ridge,
    RandomForest,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Ridge => "ridge",
            ModelKind::RandomForest => "random_forest",
        }
    }
}

/// How the recorded validation score was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Scored on a held-out split
    Holdout,
    /// Scored on the training rows; degraded confidence, not an error
    InSample,
}

/// Fitted regressor of any candidate family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearModel),
    Ridge(LinearModel),
    Forest(RandomForest),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Linear(_) => ModelKind::Linear,
            FittedModel::Ridge(_) => ModelKind::Ridge,
            FittedModel::Forest(_) => ModelKind::RandomForest,
        }
    }

    /// Predict from an already-scaled feature row
    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            FittedModel::Linear(m) | FittedModel::Ridge(m) => m.predict(features),
            FittedModel::Forest(m) => m.predict(features),
        }
    }
}

/// Descriptive record persisted alongside a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub target: Metric,
    pub kind: ModelKind,
    /// R² on the validation rows
    pub r2_score: f64,
    pub training_samples: usize,
    pub validation_mode: ValidationMode,
    pub trained_at: DateTime<Utc>,
    /// Engine version that produced the artifact; artifacts are not
    /// guaranteed readable across versions
    pub engine_version: String,
}

/// Z-score feature scaler.
///
/// Fit once on the training rows and persisted with its model; it is never
/// refit on inference inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[Vec<f64>]) -> Self {
        let cols = x.first().map_or(0, |row| row.len());
        let n = x.len().max(1) as f64;

        let means: Vec<f64> = (0..cols)
            .map(|c| x.iter().map(|row| row[c]).sum::<f64>() / n)
            .collect();
        let stds: Vec<f64> = (0..cols)
            .map(|c| {
                let var = x
                    .iter()
                    .map(|row| (row[c] - means[c]).powi(2))
                    .sum::<f64>()
                    / n;
                let std = var.sqrt();
                // Constant columns scale by 1 to avoid division by zero
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (mean, std))| (v - mean) / std)
            .collect()
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }
}

/// Coefficient of determination on validation rows.
///
/// A constant truth vector scores 0 rather than dividing by zero.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}
