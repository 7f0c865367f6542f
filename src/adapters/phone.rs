//! Phone export adapter
//!
//! Parses phone health-export record batches and maps them to canonical
//! daily series. Record types are matched by substring against a fixed
//! keyword set; anything unrecognized or malformed is skipped, matching the
//! deliberately lenient ingestion policy of consumer health exports.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::PipelineError;
use crate::types::{Metric, NormalizedBatch, Source};

use super::SourceAdapter;

/// Phone health-export adapter
pub struct PhoneExportAdapter;

impl SourceAdapter for PhoneExportAdapter {
    fn parse(&self, raw_json: &str) -> Result<NormalizedBatch, PipelineError> {
        let value: serde_json::Value = serde_json::from_str(raw_json)?;
        let records: Vec<PhoneRecord> = serde_json::from_value(value).map_err(|e| {
            PipelineError::ParseError(format!("phone export is not a record array: {e}"))
        })?;
        let mut batch = NormalizedBatch::new(Source::Phone);

        for record in &records {
            let Some(metric) = match_record_type(&record.record_type) else {
                continue;
            };
            let Some(start) = record.start else {
                continue;
            };
            let Some(value) = record_value(record, metric, start) else {
                continue;
            };
            // Canonical day key is the UTC calendar date of the start time
            batch.accept(metric, start.date_naive(), value);
        }

        Ok(batch)
    }
}

/// Map a raw record type to a canonical metric by keyword substring
fn match_record_type(record_type: &str) -> Option<Metric> {
    if record_type.contains("StepCount") {
        Some(Metric::Steps)
    } else if record_type.contains("SleepAnalysis") {
        Some(Metric::Sleep)
    } else if record_type.contains("HeartRate") {
        Some(Metric::HeartRate)
    } else if record_type.contains("ActiveEnergyBurned") {
        Some(Metric::Calories)
    } else {
        None
    }
}

/// Extract the numeric value for one record.
///
/// Sleep duration is derived from the start/end span in hours; every other
/// metric parses the reported value directly.
fn record_value(record: &PhoneRecord, metric: Metric, start: DateTime<Utc>) -> Option<f64> {
    match metric {
        Metric::Sleep => {
            let end = record.end.unwrap_or(start);
            Some((end - start).num_seconds() as f64 / 3600.0)
        }
        _ => record.value.as_deref().and_then(|v| v.parse::<f64>().ok()),
    }
}

// Phone export record structure

#[derive(Debug, Deserialize)]
struct PhoneRecord {
    #[serde(rename = "type")]
    record_type: String,
    value: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}
