//! Model training and selection
//!
//! Fits the fixed candidate slate per target metric, scores each on a
//! held-out split, selects the best by R², and persists the winner with its
//! scaler. Candidate ordering is explicit so tie-breaking stays
//! reproducible across runs.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::features::{TrainingSet, TrainingSetBuilder, MIN_METRIC_SAMPLES};
use crate::model::{
    r2_score, FittedModel, LinearModel, ModelKind, ModelMetadata, RandomForest, StandardScaler,
    ValidationMode, FOREST_SEED, FOREST_TREES,
};
use crate::store::{ModelStore, StoredModel};
use crate::types::{AlignedDataset, Metric};

/// Minimum usable rows to fit any model for a target
pub const MIN_FIT_ROWS: usize = 5;

/// Row count above which a held-out validation split is used
pub const HOLDOUT_THRESHOLD: usize = 10;

/// Fraction of rows held out for validation
pub const HOLDOUT_FRACTION: f64 = 0.2;

/// Fixed seed for the train/validation shuffle
pub const SPLIT_SEED: u64 = 42;

/// Ridge regularization strength
pub const RIDGE_ALPHA: f64 = 1.0;

/// Candidate slate, in selection tie-break order
pub const CANDIDATES: [ModelKind; 3] =
    [ModelKind::Linear, ModelKind::Ridge, ModelKind::RandomForest];

/// Result of one training invocation
#[derive(Debug, Clone)]
pub enum TrainingOutcome {
    Trained(TrainingReport),
    /// Fewer aligned rows than the training floor; nothing was persisted
    InsufficientData { available: usize, required: usize },
}

/// Summary of a successful training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub run_id: Uuid,
    /// Targets that produced a persisted model this run
    pub trained_targets: Vec<Metric>,
    /// Validation R² per trained target
    pub scores: BTreeMap<Metric, f64>,
    /// Aligned rows available to the run
    pub data_points: usize,
}

/// Trainer over aligned datasets; holds no model state of its own
pub struct ModelTrainer;

impl ModelTrainer {
    /// Train and persist the best candidate per eligible target.
    ///
    /// Per-target failures (sparse coverage, no trainable candidate) skip
    /// the target without aborting the rest of the run.
    pub fn train_all(
        dataset: &AlignedDataset,
        user_id: &str,
        store: &ModelStore,
    ) -> Result<TrainingOutcome, PipelineError> {
        if dataset.len() < MIN_METRIC_SAMPLES {
            return Ok(TrainingOutcome::InsufficientData {
                available: dataset.len(),
                required: MIN_METRIC_SAMPLES,
            });
        }

        let run_id = Uuid::new_v4();
        let mut trained_targets = Vec::new();
        let mut scores = BTreeMap::new();

        for target in Metric::ALL {
            let Some(set) = TrainingSetBuilder::build(dataset, target) else {
                tracing::debug!(metric = target.as_str(), "target skipped: not eligible");
                continue;
            };
            let Some(candidate) = Self::train_single(&set) else {
                tracing::debug!(metric = target.as_str(), "target skipped: no trainable candidate");
                continue;
            };

            let stored = StoredModel {
                model: candidate.model,
                scaler: candidate.scaler,
                metadata: ModelMetadata {
                    target,
                    kind: candidate.kind,
                    r2_score: candidate.score,
                    training_samples: set.len(),
                    validation_mode: candidate.validation_mode,
                    trained_at: Utc::now(),
                    engine_version: crate::VITALFUSE_VERSION.to_string(),
                },
            };
            store.save(user_id, target, &stored)?;

            tracing::info!(
                %run_id,
                metric = target.as_str(),
                kind = candidate.kind.as_str(),
                score = candidate.score,
                "selected model for target"
            );
            scores.insert(target, candidate.score);
            trained_targets.push(target);
        }

        Ok(TrainingOutcome::Trained(TrainingReport {
            run_id,
            trained_targets,
            scores,
            data_points: dataset.len(),
        }))
    }

    /// Fit and score the candidate slate for one target; `None` when no
    /// candidate could be trained
    fn train_single(set: &TrainingSet) -> Option<SelectedCandidate> {
        if set.len() < MIN_FIT_ROWS {
            return None;
        }

        let scaler = StandardScaler::fit(&set.x);
        let scaled = scaler.transform(&set.x);

        let (train_idx, test_idx, validation_mode) = split_indices(set.len());
        let take = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            (
                indices.iter().map(|&i| scaled[i].clone()).collect(),
                indices.iter().map(|&i| set.y[i]).collect(),
            )
        };
        let (x_train, y_train) = take(&train_idx);
        let (x_test, y_test) = take(&test_idx);

        let mut best: Option<(ModelKind, FittedModel, f64)> = None;
        for kind in CANDIDATES {
            let fitted = match fit_candidate(kind, &x_train, &y_train) {
                Ok(model) => model,
                Err(err) => {
                    tracing::debug!(kind = kind.as_str(), %err, "candidate fit failed");
                    continue;
                }
            };
            let predictions: Vec<f64> = x_test.iter().map(|row| fitted.predict(row)).collect();
            let score = r2_score(&y_test, &predictions);
            tracing::debug!(kind = kind.as_str(), score, "scored candidate");

            // Strict comparison keeps the first candidate on ties
            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((kind, fitted, score));
            }
        }

        best.map(|(kind, model, score)| SelectedCandidate {
            kind,
            model,
            scaler,
            score,
            validation_mode,
        })
    }
}

struct SelectedCandidate {
    kind: ModelKind,
    model: FittedModel,
    scaler: StandardScaler,
    score: f64,
    validation_mode: ValidationMode,
}

fn fit_candidate(
    kind: ModelKind,
    x: &[Vec<f64>],
    y: &[f64],
) -> Result<FittedModel, PipelineError> {
    match kind {
        ModelKind::Linear => LinearModel::fit_ols(x, y).map(FittedModel::Linear),
        ModelKind::Ridge => LinearModel::fit_ridge(x, y, RIDGE_ALPHA).map(FittedModel::Ridge),
        ModelKind::RandomForest => {
            RandomForest::fit(x, y, FOREST_TREES, FOREST_SEED).map(FittedModel::Forest)
        }
    }
}

/// Deterministic train/validation index split.
///
/// With `HOLDOUT_THRESHOLD` rows or fewer, training and validation share
/// the same rows; the degraded confidence is surfaced through the
/// validation mode rather than hidden in the score.
fn split_indices(n: usize) -> (Vec<usize>, Vec<usize>, ValidationMode) {
    if n <= HOLDOUT_THRESHOLD {
        let all: Vec<usize> = (0..n).collect();
        return (all.clone(), all, ValidationMode::InSample);
    }

    let mut indices: Vec<usize> = (0..n).collect();
    shuffle(&mut indices, SPLIT_SEED);

    let test_size = ((n as f64 * HOLDOUT_FRACTION).ceil() as usize).max(1);
    let test = indices[..test_size].to_vec();
    let train = indices[test_size..].to_vec();
    (train, test, ValidationMode::Holdout)
}

/// Fisher-Yates shuffle driven by a SplitMix64 sequence
fn shuffle(indices: &mut [usize], seed: u64) {
    let mut state = seed;
    let mut next = || {
        state = state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    };
    for i in (1..indices.len()).rev() {
        let j = (next() % (i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
}
