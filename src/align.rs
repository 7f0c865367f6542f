//! Time-series alignment
//!
//! Joins the merged per-metric series into a dense per-day table. Rows keep
//! only metrics with a value for that exact date; days covered by a single
//! metric are too sparse to train on and are dropped rather than imputed.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AlignedDataset, AlignedRow, Metric, UnifiedSeries};

/// Minimum populated metrics for a row to be retained
pub const MIN_ROW_METRICS: usize = 2;

/// Aligner joining per-metric series into a per-day dataset
pub struct SeriesAligner;

impl SeriesAligner {
    /// Build an aligned dataset from merged series, ascending by date.
    ///
    /// Deterministic: identical inputs produce identical row order and
    /// content.
    pub fn align(series: &BTreeMap<Metric, UnifiedSeries>) -> AlignedDataset {
        let dates: BTreeSet<_> = series
            .values()
            .flat_map(|s| s.points().iter().map(|p| p.date))
            .collect();

        let rows = dates
            .into_iter()
            .map(|date| {
                let values: BTreeMap<Metric, f64> = series
                    .iter()
                    .filter_map(|(metric, s)| s.get(date).map(|v| (*metric, v)))
                    .collect();
                AlignedRow { date, values }
            })
            .filter(|row| row.values.len() >= MIN_ROW_METRICS)
            .collect();

        AlignedDataset::from_rows(rows)
    }
}
