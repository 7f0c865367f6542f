//! Pipeline orchestration
//!
//! This module provides the public API for vitalfuse: normalize raw source
//! payloads, merge them under the trust policy, align the merged series,
//! and run training, prediction, and analytics over the result.
//!
//! Everything here is synchronous; the only I/O is model persistence.
//! Callers are expected to serialize training runs per user.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::adapters::{PhoneExportAdapter, RingApiAdapter, SourceAdapter};
use crate::align::SeriesAligner;
use crate::analytics;
use crate::error::PipelineError;
use crate::merge::SourceMerger;
use crate::store::ModelStore;
use crate::trainer::{ModelTrainer, TrainingOutcome};
use crate::types::{
    AlignedDataset, AnalyticsSummary, Metric, NormalizedBatch, UnifiedSeries,
};

/// End-to-end reconciliation and learning pipeline.
///
/// Owns the model store; all other stages are stateless computations.
pub struct HealthPipeline {
    store: ModelStore,
}

impl HealthPipeline {
    /// Create a pipeline persisting models under `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: ModelStore::new(model_dir),
        }
    }

    /// Normalize a phone export payload into per-metric daily series
    pub fn normalize_phone(&self, raw_json: &str) -> Result<NormalizedBatch, PipelineError> {
        PhoneExportAdapter.parse(raw_json)
    }

    /// Normalize a ring API payload into per-metric daily series
    pub fn normalize_ring(&self, raw_json: &str) -> Result<NormalizedBatch, PipelineError> {
        RingApiAdapter.parse(raw_json)
    }

    /// Merge both sources' normalized batches into one series per metric
    pub fn unify(
        &self,
        phone: Option<&NormalizedBatch>,
        ring: Option<&NormalizedBatch>,
    ) -> BTreeMap<Metric, UnifiedSeries> {
        SourceMerger::merge_all(phone, ring)
    }

    /// Align merged series into the per-day training table
    pub fn align(&self, series: &BTreeMap<Metric, UnifiedSeries>) -> AlignedDataset {
        SeriesAligner::align(series)
    }

    /// Train and persist the best model per eligible target metric
    pub fn train(
        &self,
        dataset: &AlignedDataset,
        user_id: &str,
    ) -> Result<TrainingOutcome, PipelineError> {
        ModelTrainer::train_all(dataset, user_id, &self.store)
    }

    /// Predict a target from raw feature values using the stored model and
    /// its paired scaler.
    ///
    /// `None` means no model has been trained for the target; this is a
    /// normal steady state for new users, not an error.
    pub fn predict(&self, user_id: &str, target: Metric, features: &[f64]) -> Option<f64> {
        let stored = self.store.load_target(user_id, target)?;
        if features.len() != stored.scaler.n_features() {
            tracing::warn!(
                metric = target.as_str(),
                expected = stored.scaler.n_features(),
                got = features.len(),
                "feature count mismatch; refusing to predict"
            );
            return None;
        }
        Some(stored.predict(features))
    }

    /// Derived statistics for one merged series
    pub fn summarize(&self, series: &UnifiedSeries) -> AnalyticsSummary {
        analytics::summarize(series)
    }

    /// Access the underlying model store
    pub fn store(&self) -> &ModelStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use tempfile::TempDir;

    /// Build paired phone/ring payloads covering `n` days with correlated
    /// sleep and steps
    fn sample_payloads(n: u32) -> (String, String) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut phone_records = Vec::new();
        let mut ring_sleep = Vec::new();
        let mut ring_activity = Vec::new();

        for i in 0..n {
            let date = start + Days::new(i as u64);
            let sleep_hours = 6.0 + (i % 5) as f64 * 0.5;
            let steps = 4000.0 + sleep_hours * 800.0;

            phone_records.push(serde_json::json!({
                "type": "HKQuantityTypeIdentifierStepCount",
                "value": format!("{steps}"),
                "start": format!("{date}T09:00:00Z"),
                "end": format!("{date}T21:00:00Z"),
            }));
            phone_records.push(serde_json::json!({
                "type": "HKQuantityTypeIdentifierActiveEnergyBurned",
                "value": format!("{}", 300.0 + steps / 20.0),
                "start": format!("{date}T09:00:00Z"),
                "end": format!("{date}T21:00:00Z"),
            }));
            ring_sleep.push(serde_json::json!({
                "day": format!("{date}"),
                "total_sleep_duration": sleep_hours * 3600.0,
            }));
            ring_activity.push(serde_json::json!({
                "day": format!("{date}"),
                "steps": steps - 250.0,
                "active_calories": 400,
                "total_calories": 1700,
            }));
        }

        let phone = serde_json::to_string(&phone_records).unwrap();
        let ring = serde_json::to_string(&serde_json::json!({
            "sleep": ring_sleep,
            "activity": ring_activity,
        }))
        .unwrap();
        (phone, ring)
    }

    #[test]
    fn test_end_to_end_train_and_predict() {
        let dir = TempDir::new().unwrap();
        let pipeline = HealthPipeline::new(dir.path());
        let (phone_json, ring_json) = sample_payloads(30);

        let phone = pipeline.normalize_phone(&phone_json).unwrap();
        let ring = pipeline.normalize_ring(&ring_json).unwrap();
        let unified = pipeline.unify(Some(&phone), Some(&ring));
        let dataset = pipeline.align(&unified);

        assert_eq!(dataset.len(), 30);
        // Steps come from the phone on overlapping dates
        let steps = &unified[&Metric::Steps];
        assert_eq!(
            steps.points()[0].source,
            crate::types::Source::Phone
        );

        let outcome = pipeline.train(&dataset, "alice").unwrap();
        let TrainingOutcome::Trained(report) = outcome else {
            panic!("expected a trained report");
        };
        assert!(report.trained_targets.contains(&Metric::Steps));

        let stored = pipeline.store().load_target("alice", Metric::Steps).unwrap();
        let n_features = stored.scaler.n_features();
        let prediction = pipeline.predict("alice", Metric::Steps, &vec![7.0; n_features]);
        assert!(prediction.is_some());
    }

    #[test]
    fn test_predict_without_model_is_none() {
        let dir = TempDir::new().unwrap();
        let pipeline = HealthPipeline::new(dir.path());
        assert_eq!(pipeline.predict("nobody", Metric::Steps, &[7.0]), None);
    }

    #[test]
    fn test_predict_feature_count_mismatch_is_none() {
        let dir = TempDir::new().unwrap();
        let pipeline = HealthPipeline::new(dir.path());
        let (phone_json, ring_json) = sample_payloads(30);

        let phone = pipeline.normalize_phone(&phone_json).unwrap();
        let ring = pipeline.normalize_ring(&ring_json).unwrap();
        let dataset = pipeline.align(&pipeline.unify(Some(&phone), Some(&ring)));
        pipeline.train(&dataset, "alice").unwrap();

        assert_eq!(pipeline.predict("alice", Metric::Steps, &[]), None);
    }

    #[test]
    fn test_small_history_reports_insufficient_data() {
        let dir = TempDir::new().unwrap();
        let pipeline = HealthPipeline::new(dir.path());
        let (phone_json, ring_json) = sample_payloads(9);

        let phone = pipeline.normalize_phone(&phone_json).unwrap();
        let ring = pipeline.normalize_ring(&ring_json).unwrap();
        let dataset = pipeline.align(&pipeline.unify(Some(&phone), Some(&ring)));

        let outcome = pipeline.train(&dataset, "alice").unwrap();
        assert!(matches!(
            outcome,
            TrainingOutcome::InsufficientData { available: 9, .. }
        ));
    }

    #[test]
    fn test_ring_only_ingestion() {
        let dir = TempDir::new().unwrap();
        let pipeline = HealthPipeline::new(dir.path());
        let (_, ring_json) = sample_payloads(5);

        let ring = pipeline.normalize_ring(&ring_json).unwrap();
        let unified = pipeline.unify(None, Some(&ring));

        // Ring supplies all four metrics (heart rate via placeholder)
        assert_eq!(unified.len(), 4);
        for series in unified.values() {
            assert_eq!(series.len(), 5);
        }
    }
}
