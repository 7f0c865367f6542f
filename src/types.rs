//! Core types for the vitalfuse pipeline
//!
//! This module defines the data structures that flow through each stage:
//! per-source daily series, merged series with provenance, and the aligned
//! per-day table consumed by training and analytics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical health metric tracked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Sleep,
    Steps,
    HeartRate,
    Calories,
}

impl Metric {
    /// All canonical metrics, in the fixed order used for per-metric loops
    pub const ALL: [Metric; 4] = [
        Metric::Sleep,
        Metric::Steps,
        Metric::HeartRate,
        Metric::Calories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Sleep => "sleep",
            Metric::Steps => "steps",
            Metric::HeartRate => "heart_rate",
            Metric::Calories => "calories",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        match name {
            "sleep" => Some(Metric::Sleep),
            "steps" => Some(Metric::Steps),
            "heart_rate" => Some(Metric::HeartRate),
            "calories" => Some(Metric::Calories),
            _ => None,
        }
    }
}

/// Origin of a metric's raw data, for provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Phone,
    Ring,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Phone => "phone",
            Source::Ring => "ring",
        }
    }
}

/// One daily observation of one metric from one source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub source: Source,
}

/// Daily series for one metric from one source.
///
/// Keys are calendar dates; values are finite floats. Duplicate dates within
/// a normalization pass resolve last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    values: BTreeMap<NaiveDate, f64>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a daily value. Non-finite values are rejected; an existing
    /// value for the same date is overwritten. Returns whether the value
    /// was accepted.
    pub fn insert(&mut self, date: NaiveDate, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.values.insert(date, value);
        true
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in ascending date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.values.keys().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.values.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.values.keys().next_back().copied()
    }
}

impl FromIterator<(NaiveDate, f64)> for MetricSeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        let mut series = MetricSeries::new();
        for (date, value) in iter {
            series.insert(date, value);
        }
        series
    }
}

/// Output of normalizing one source's raw payload: per-metric series plus
/// the accepted date range for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub source: Source,
    pub series: BTreeMap<Metric, MetricSeries>,
    /// Earliest accepted record date, if any records were accepted
    pub start_date: Option<NaiveDate>,
    /// Latest accepted record date, if any records were accepted
    pub end_date: Option<NaiveDate>,
    /// Number of raw records that contributed a value
    pub accepted_records: usize,
}

impl NormalizedBatch {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            series: BTreeMap::new(),
            start_date: None,
            end_date: None,
            accepted_records: 0,
        }
    }

    /// Record one accepted observation, updating the series and date range
    pub fn accept(&mut self, metric: Metric, date: NaiveDate, value: f64) {
        if self.series.entry(metric).or_default().insert(date, value) {
            self.accepted_records += 1;
            self.start_date = Some(self.start_date.map_or(date, |d| d.min(date)));
            self.end_date = Some(self.end_date.map_or(date, |d| d.max(date)));
        }
    }

    pub fn series_for(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }
}

/// Merged series for one metric, dates sorted descending.
///
/// Downstream consumers rely on the most-recent-first ordering for
/// "last N days" slicing. Each point records which source won its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSeries {
    pub metric: Metric,
    points: Vec<MetricPoint>,
}

impl UnifiedSeries {
    /// Build from points already sorted descending by date
    pub(crate) fn from_sorted(metric: Metric, points: Vec<MetricPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date > w[1].date));
        Self { metric, points }
    }

    /// Points in descending date order (most recent first)
    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    /// The most recent `n` points (fewer if the series is shorter)
    pub fn recent(&self, n: usize) -> &[MetricPoint] {
        &self.points[..n.min(self.points.len())]
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.date == date)
            .map(|p| p.value)
    }

    /// Values in chronological (ascending date) order
    pub fn values_ascending(&self) -> Vec<f64> {
        self.points.iter().rev().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One calendar day's multi-metric snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub values: BTreeMap<Metric, f64>,
}

impl AlignedRow {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// Ascending-by-date sequence of aligned rows; immutable training snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    rows: Vec<AlignedRow>,
}

impl AlignedDataset {
    pub(crate) fn from_rows(rows: Vec<AlignedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows where `metric` has a value
    pub fn coverage(&self, metric: Metric) -> usize {
        self.rows.iter().filter(|r| r.get(metric).is_some()).count()
    }
}

/// Weekday vs weekend averages for one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekendPattern {
    pub weekday_avg: f64,
    pub weekend_avg: f64,
    /// weekend − weekday; 0 if either partition is empty
    pub difference: f64,
}

/// Result of checking the most recent value against its baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCheck {
    pub value: f64,
    pub baseline: f64,
    /// Absolute-deviation threshold, in the metric's own units
    pub threshold: f64,
    pub is_anomaly: bool,
}

/// Derived statistics for one metric's daily series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub metric: Metric,
    /// Accumulated hours under the 8h target over the last week;
    /// only computed for sleep series
    pub sleep_debt_hours: Option<f64>,
    pub weekend_pattern: WeekendPattern,
    /// Linear trend slope over the most recent window
    pub trend_slope: f64,
    /// Anomaly check for the latest value, when enough history exists
    pub latest_anomaly: Option<AnomalyCheck>,
}
