//! Random forest regression
//!
//! Bootstrap-aggregated variance-minimizing regression trees with a fixed
//! tree count and a fixed seed, so repeated training runs over the same
//! data select identical models.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Fixed ensemble size
pub const FOREST_TREES: usize = 50;

/// Fixed seed for bootstrap sampling
pub const FOREST_SEED: u64 = 42;

const MAX_DEPTH: usize = 8;
const MIN_SPLIT_SAMPLES: usize = 4;

/// Fitted random forest regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<TreeNode>,
}

impl RandomForest {
    /// Fit `n_trees` bootstrap trees with a deterministic sampling seed
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        n_trees: usize,
        seed: u64,
    ) -> Result<Self, PipelineError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::FitError(
                "empty or mismatched design matrix".to_string(),
            ));
        }

        let mut rng = SplitMix64::new(seed);
        let trees = (0..n_trees)
            .map(|_| {
                let indices: Vec<usize> = (0..x.len())
                    .map(|_| rng.next_below(x.len()))
                    .collect();
                build_tree(x, y, &indices, 0)
            })
            .collect();

        Ok(Self { trees })
    }

    /// Mean prediction across all trees
    pub fn predict(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

fn build_tree(x: &[Vec<f64>], y: &[f64], indices: &[usize], depth: usize) -> TreeNode {
    let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;

    if depth >= MAX_DEPTH || indices.len() < MIN_SPLIT_SAMPLES {
        return TreeNode::Leaf { value: mean };
    }

    let Some((feature, threshold)) = best_split(x, y, indices) else {
        return TreeNode::Leaf { value: mean };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[i][feature] <= threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return TreeNode::Leaf { value: mean };
    }

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(build_tree(x, y, &left_idx, depth + 1)),
        right: Box::new(build_tree(x, y, &right_idx, depth + 1)),
    }
}

/// Pick the (feature, threshold) split minimizing weighted child variance.
/// Candidate thresholds are midpoints between consecutive distinct values.
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n_features = x[0].len();
    let parent_score = sum_squared_error(y, indices);

    let mut best: Option<(usize, f64, f64)> = None;
    for feature in 0..n_features {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| x[i][feature] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let score = sum_squared_error(y, &left) + sum_squared_error(y, &right);
            if best.map_or(score < parent_score, |(_, _, s)| score < s) {
                best = Some((feature, threshold, score));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

fn sum_squared_error(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
    indices.iter().map(|&i| (y[i] - mean).powi(2)).sum()
}

/// SplitMix64 generator; small, deterministic, and good enough for
/// bootstrap index sampling
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn next_below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}
