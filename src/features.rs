//! Feature and target construction
//!
//! Turns an aligned dataset into numeric matrices for one target metric at
//! a time. Metrics with sparse coverage are excluded entirely; retained
//! feature columns are mean-imputed where a row lacks them.

use crate::types::{AlignedDataset, Metric};

/// Minimum non-missing values for a metric to be usable as a feature or
/// target
pub const MIN_METRIC_SAMPLES: usize = 10;

/// Numeric matrices for one target metric
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub target: Metric,
    /// One entry per feature column, in `Metric::ALL` order
    pub feature_names: Vec<Metric>,
    /// One row per aligned row where the target is present
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Builder turning aligned rows into training matrices
pub struct TrainingSetBuilder;

impl TrainingSetBuilder {
    /// Metrics with enough coverage to participate in training
    pub fn eligible_metrics(dataset: &AlignedDataset) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| dataset.coverage(*m) >= MIN_METRIC_SAMPLES)
            .collect()
    }

    /// Build `(X, y)` for one target metric.
    ///
    /// Returns `None` when the target lacks coverage or no eligible feature
    /// column remains after exclusions; the target is then skipped for this
    /// run, not an error.
    pub fn build(dataset: &AlignedDataset, target: Metric) -> Option<TrainingSet> {
        let eligible = Self::eligible_metrics(dataset);
        if !eligible.contains(&target) {
            return None;
        }

        let feature_names: Vec<Metric> =
            eligible.into_iter().filter(|m| *m != target).collect();
        if feature_names.is_empty() {
            return None;
        }

        // Imputation means are computed over the whole aligned dataset
        let means: Vec<f64> = feature_names
            .iter()
            .map(|m| column_mean(dataset, *m))
            .collect();

        let mut x = Vec::new();
        let mut y = Vec::new();
        for row in dataset.rows() {
            let Some(target_value) = row.get(target) else {
                continue;
            };
            let features = feature_names
                .iter()
                .zip(&means)
                .map(|(m, mean)| row.get(*m).unwrap_or(*mean))
                .collect();
            x.push(features);
            y.push(target_value);
        }

        Some(TrainingSet {
            target,
            feature_names,
            x,
            y,
        })
    }
}

fn column_mean(dataset: &AlignedDataset, metric: Metric) -> f64 {
    let values: Vec<f64> = dataset
        .rows()
        .iter()
        .filter_map(|r| r.get(metric))
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
