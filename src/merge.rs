//! Source merge engine
//!
//! Combines per-source daily series into one series per metric under a
//! fixed per-metric trust policy. Resolution is per metric, per date: the
//! fallback source fills only the dates the primary source lacks, so a
//! merged series can interleave both sources across different days.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Metric, MetricPoint, MetricSeries, NormalizedBatch, Source, UnifiedSeries};

/// Primary and fallback source for a metric.
///
/// The ring tracks sleep and heart rate more reliably; the phone carries
/// the fuller step and calorie history.
pub fn priority(metric: Metric) -> (Source, Source) {
    match metric {
        Metric::Sleep => (Source::Ring, Source::Phone),
        Metric::Steps => (Source::Phone, Source::Ring),
        Metric::HeartRate => (Source::Ring, Source::Phone),
        Metric::Calories => (Source::Phone, Source::Ring),
    }
}

/// Merge engine for per-source metric series
pub struct SourceMerger;

impl SourceMerger {
    /// Merge one metric's per-source series.
    ///
    /// Output dates are sorted descending (most recent first). Returns
    /// `None` when neither source has data for the metric.
    pub fn merge(
        metric: Metric,
        phone: Option<&MetricSeries>,
        ring: Option<&MetricSeries>,
    ) -> Option<UnifiedSeries> {
        let (primary, fallback) = priority(metric);

        let mut dates: BTreeSet<_> = BTreeSet::new();
        for series in [phone, ring].into_iter().flatten() {
            dates.extend(series.dates());
        }
        if dates.is_empty() {
            return None;
        }

        let by_source = |source: Source| match source {
            Source::Phone => phone,
            Source::Ring => ring,
        };

        let mut points = Vec::with_capacity(dates.len());
        for date in dates.into_iter().rev() {
            let chosen = [primary, fallback].into_iter().find_map(|source| {
                by_source(source)
                    .and_then(|s| s.get(date))
                    .map(|value| (value, source))
            });
            if let Some((value, source)) = chosen {
                points.push(MetricPoint {
                    date,
                    value,
                    source,
                });
            }
        }

        Some(UnifiedSeries::from_sorted(metric, points))
    }

    /// Merge every canonical metric across both source batches.
    ///
    /// Metrics with no data in either source are absent from the output.
    pub fn merge_all(
        phone: Option<&NormalizedBatch>,
        ring: Option<&NormalizedBatch>,
    ) -> BTreeMap<Metric, UnifiedSeries> {
        let mut merged = BTreeMap::new();
        for metric in Metric::ALL {
            let unified = Self::merge(
                metric,
                phone.and_then(|b| b.series_for(metric)),
                ring.and_then(|b| b.series_for(metric)),
            );
            if let Some(series) = unified {
                merged.insert(metric, series);
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(entries: &[(&str, f64)]) -> MetricSeries {
        entries.iter().map(|(s, v)| (d(s), *v)).collect()
    }

    #[test]
    fn test_single_source_wins_outright() {
        let phone = series(&[("2024-01-01", 1000.0), ("2024-01-02", 2000.0)]);

        let merged = SourceMerger::merge(Metric::Steps, Some(&phone), None).unwrap();

        assert_eq!(merged.len(), 2);
        for point in merged.points() {
            assert_eq!(point.source, Source::Phone);
            assert_eq!(phone.get(point.date), Some(point.value));
        }
    }

    #[test]
    fn test_sleep_prefers_ring_per_date() {
        let phone = series(&[("2024-01-01", 6.0), ("2024-01-02", 6.5)]);
        let ring = series(&[("2024-01-02", 7.5), ("2024-01-03", 8.0)]);

        let merged = SourceMerger::merge(Metric::Sleep, Some(&phone), Some(&ring)).unwrap();

        // Ring wins overlapping dates; phone fills 01-01
        assert_eq!(merged.get(d("2024-01-02")), Some(7.5));
        assert_eq!(merged.get(d("2024-01-03")), Some(8.0));
        assert_eq!(merged.get(d("2024-01-01")), Some(6.0));
        assert_eq!(merged.points()[2].source, Source::Phone);
        assert_eq!(merged.points()[1].source, Source::Ring);
    }

    #[test]
    fn test_steps_prefers_phone_per_date() {
        // End-to-end scenario from the reconciliation contract
        let phone = series(&[("2024-01-01", 1000.0), ("2024-01-02", 2000.0)]);
        let ring = series(&[("2024-01-02", 2500.0)]);

        let merged = SourceMerger::merge(Metric::Steps, Some(&phone), Some(&ring)).unwrap();

        let values: Vec<(NaiveDate, f64)> =
            merged.points().iter().map(|p| (p.date, p.value)).collect();
        assert_eq!(
            values,
            vec![(d("2024-01-02"), 2000.0), (d("2024-01-01"), 1000.0)]
        );
    }

    #[test]
    fn test_output_sorted_descending() {
        let ring = series(&[
            ("2024-01-03", 71.0),
            ("2024-01-01", 70.0),
            ("2024-01-05", 72.0),
        ]);

        let merged = SourceMerger::merge(Metric::HeartRate, None, Some(&ring)).unwrap();

        let dates: Vec<NaiveDate> = merged.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d("2024-01-05"), d("2024-01-03"), d("2024-01-01")]);
    }

    #[test]
    fn test_neither_source_is_absent() {
        assert!(SourceMerger::merge(Metric::Calories, None, None).is_none());

        let empty = MetricSeries::new();
        assert!(SourceMerger::merge(Metric::Calories, Some(&empty), None).is_none());
    }

    #[test]
    fn test_merge_all_skips_missing_metrics() {
        let mut phone = NormalizedBatch::new(Source::Phone);
        phone.accept(Metric::Steps, d("2024-01-01"), 1000.0);

        let merged = SourceMerger::merge_all(Some(&phone), None);

        assert_eq!(merged.len(), 1);
        assert!(merged.contains_key(&Metric::Steps));
    }
}
