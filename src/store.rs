//! Model persistence
//!
//! Durable per-user, per-target storage of trained model/scaler pairs. Each
//! user owns one directory holding a `{target}_model.bin` and
//! `{target}_scaler.bin` per trained target. Artifacts are opaque bincode
//! snapshots of the learned parameters; compatibility across serialization
//! versions is not guaranteed, so a version bump invalidates stored models.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{FittedModel, ModelMetadata, StandardScaler};
use crate::types::Metric;

/// A trained model with its paired scaler and descriptive metadata.
///
/// The scaler was fit alongside the model; applying any other scaler at
/// prediction time is unsupported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredModel {
    pub model: FittedModel,
    pub scaler: StandardScaler,
    pub metadata: ModelMetadata,
}

impl StoredModel {
    /// Predict from raw (unscaled) feature values
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.model.predict(&self.scaler.transform_row(features))
    }
}

/// Model record half of an artifact pair
#[derive(Debug, Serialize, Deserialize)]
struct ModelRecord {
    model: FittedModel,
    metadata: ModelMetadata,
}

/// File-based per-user model store
#[derive(Debug, Clone)]
pub struct ModelStore {
    base_dir: PathBuf,
}

impl ModelStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_dir.join(user_id)
    }

    fn model_path(&self, user_id: &str, target: Metric) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{}_model.bin", target.as_str()))
    }

    fn scaler_path(&self, user_id: &str, target: Metric) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{}_scaler.bin", target.as_str()))
    }

    /// Persist a trained model, replacing any prior artifact pair for the
    /// target. Each file is written to a temp path and renamed so a
    /// subsequent load never observes a partially written artifact.
    pub fn save(
        &self,
        user_id: &str,
        target: Metric,
        stored: &StoredModel,
    ) -> Result<(), PipelineError> {
        fs::create_dir_all(self.user_dir(user_id))?;

        let record = ModelRecord {
            model: stored.model.clone(),
            metadata: stored.metadata.clone(),
        };
        let model_bytes = bincode::serialize(&record)
            .map_err(|e| PipelineError::PersistenceError(e.to_string()))?;
        let scaler_bytes = bincode::serialize(&stored.scaler)
            .map_err(|e| PipelineError::PersistenceError(e.to_string()))?;

        write_atomic(&self.model_path(user_id, target), &model_bytes)?;
        write_atomic(&self.scaler_path(user_id, target), &scaler_bytes)?;

        tracing::info!(
            user_id,
            metric = target.as_str(),
            kind = stored.metadata.kind.as_str(),
            "persisted trained model"
        );
        Ok(())
    }

    /// Load one target's model/scaler pair; `None` when absent or corrupt
    pub fn load_target(&self, user_id: &str, target: Metric) -> Option<StoredModel> {
        let record: ModelRecord = read_artifact(&self.model_path(user_id, target))?;
        let scaler: StandardScaler = read_artifact(&self.scaler_path(user_id, target))?;
        Some(StoredModel {
            model: record.model,
            scaler,
            metadata: record.metadata,
        })
    }

    /// Best-effort load of every persisted target for a user.
    ///
    /// A corrupted or half-missing artifact pair is skipped with a warning;
    /// it never aborts the load of other targets.
    pub fn load(&self, user_id: &str) -> BTreeMap<Metric, StoredModel> {
        let mut loaded = BTreeMap::new();
        for target in Metric::ALL {
            if !self.model_path(user_id, target).exists() {
                continue;
            }
            match self.load_target(user_id, target) {
                Some(stored) => {
                    loaded.insert(target, stored);
                }
                None => {
                    tracing::warn!(
                        user_id,
                        metric = target.as_str(),
                        "skipping unreadable model artifact"
                    );
                }
            }
        }
        loaded
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    bincode::deserialize(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearModel, ModelKind, ValidationMode};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_stored(target: Metric) -> StoredModel {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        StoredModel {
            model: FittedModel::Linear(LinearModel {
                intercept: 1.0,
                coefficients: vec![2.0],
            }),
            scaler: StandardScaler::fit(&x),
            metadata: ModelMetadata {
                target,
                kind: ModelKind::Linear,
                r2_score: 0.9,
                training_samples: 3,
                validation_mode: ValidationMode::InSample,
                trained_at: Utc::now(),
                engine_version: crate::VITALFUSE_VERSION.to_string(),
            },
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        let stored = sample_stored(Metric::Steps);

        store.save("alice", Metric::Steps, &stored).unwrap();
        let loaded = store.load_target("alice", Metric::Steps).unwrap();

        assert_eq!(loaded.metadata.kind, ModelKind::Linear);
        assert_eq!(loaded.predict(&[2.0]), stored.predict(&[2.0]));
    }

    #[test]
    fn test_load_missing_user_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(store.load("nobody").is_empty());
    }

    #[test]
    fn test_corrupt_artifact_skipped() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());

        store
            .save("alice", Metric::Steps, &sample_stored(Metric::Steps))
            .unwrap();
        store
            .save("alice", Metric::Sleep, &sample_stored(Metric::Sleep))
            .unwrap();

        // Corrupt one model file; the other target still loads
        fs::write(store.model_path("alice", Metric::Sleep), b"garbage").unwrap();

        let loaded = store.load("alice");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&Metric::Steps));
    }

    #[test]
    fn test_missing_scaler_skips_target() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());

        store
            .save("alice", Metric::Steps, &sample_stored(Metric::Steps))
            .unwrap();
        fs::remove_file(store.scaler_path("alice", Metric::Steps)).unwrap();

        assert!(store.load("alice").is_empty());
    }

    #[test]
    fn test_retrain_overwrites_whole_record() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path());

        store
            .save("alice", Metric::Steps, &sample_stored(Metric::Steps))
            .unwrap();

        let mut replacement = sample_stored(Metric::Steps);
        replacement.metadata.r2_score = 0.5;
        replacement.model = FittedModel::Linear(LinearModel {
            intercept: 0.0,
            coefficients: vec![1.0],
        });
        store.save("alice", Metric::Steps, &replacement).unwrap();

        let loaded = store.load_target("alice", Metric::Steps).unwrap();
        assert_eq!(loaded.metadata.r2_score, 0.5);
        assert_eq!(loaded.model.predict(&[3.0]), 3.0);
    }
}
