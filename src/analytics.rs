//! Series analytics
//!
//! Pure functions over a single metric's daily series, with no model
//! dependency: sleep debt, weekday/weekend pattern, linear trend, and
//! anomaly checks. These feed whatever narrative layer sits above the core.

use chrono::Datelike;

use crate::types::{AnalyticsSummary, AnomalyCheck, Metric, UnifiedSeries, WeekendPattern};

/// Nightly sleep target in hours
pub const SLEEP_TARGET_HOURS: f64 = 8.0;

/// Entries considered by the sleep-debt window
pub const DEBT_WINDOW: usize = 7;

/// Default trend window in days
pub const TREND_WINDOW: usize = 7;

/// Default anomaly threshold, in the metric's own units
pub const ANOMALY_THRESHOLD: f64 = 2.0;

/// Prior values averaged into the anomaly baseline
pub const BASELINE_WINDOW: usize = 14;

/// Minimum prior values before an anomaly check is attempted
const MIN_BASELINE_SAMPLES: usize = 3;

/// Accumulated hours under the nightly target over the most recent week.
///
/// Returns 0 when fewer than a full week of entries exists; a partial week
/// is not enough history to call debt.
pub fn sleep_debt(series: &UnifiedSeries) -> f64 {
    if series.len() < DEBT_WINDOW {
        return 0.0;
    }
    series
        .recent(DEBT_WINDOW)
        .iter()
        .map(|p| (SLEEP_TARGET_HOURS - p.value).max(0.0))
        .sum()
}

/// Partition entries into weekday (Mon-Fri) and weekend (Sat-Sun) means.
///
/// An empty partition reports 0, and the difference is 0 unless both
/// partitions have data.
pub fn weekend_pattern(series: &UnifiedSeries) -> WeekendPattern {
    let mut weekday = Vec::new();
    let mut weekend = Vec::new();

    for point in series.points() {
        if point.date.weekday().number_from_monday() <= 5 {
            weekday.push(point.value);
        } else {
            weekend.push(point.value);
        }
    }

    let weekday_avg = mean(&weekday);
    let weekend_avg = mean(&weekend);
    let difference = if weekday.is_empty() || weekend.is_empty() {
        0.0
    } else {
        weekend_avg - weekday_avg
    };

    WeekendPattern {
        weekday_avg,
        weekend_avg,
        difference,
    }
}

/// Ordinary least-squares slope of the most recent `days` chronological
/// values against their ordinal position.
///
/// Returns 0 when fewer than `days` values exist or the position variance
/// is degenerate.
pub fn trend(values: &[f64], days: usize) -> f64 {
    if values.len() < days || days < 2 {
        return 0.0;
    }
    let recent = &values[values.len() - days..];
    let n = recent.len() as f64;

    let sum_x: f64 = (0..recent.len()).map(|i| i as f64).sum();
    let sum_y: f64 = recent.iter().sum();
    let sum_xy: f64 = recent.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..recent.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Absolute-deviation anomaly check.
///
/// The threshold is an absolute difference in the metric's own units, not a
/// z-score; the comparison is intentionally unit-for-unit with the
/// baseline.
pub fn is_anomaly(value: f64, baseline: f64, threshold: f64) -> bool {
    (value - baseline).abs() > threshold
}

/// Derived statistics for one series.
///
/// The anomaly check compares the most recent value against the mean of up
/// to the 14 preceding values, and is skipped with fewer than 3 priors.
pub fn summarize(series: &UnifiedSeries) -> AnalyticsSummary {
    let sleep_debt_hours = match series.metric {
        Metric::Sleep => Some(sleep_debt(series)),
        _ => None,
    };

    AnalyticsSummary {
        metric: series.metric,
        sleep_debt_hours,
        weekend_pattern: weekend_pattern(series),
        trend_slope: trend(&series.values_ascending(), TREND_WINDOW),
        latest_anomaly: latest_anomaly(series, ANOMALY_THRESHOLD),
    }
}

fn latest_anomaly(series: &UnifiedSeries, threshold: f64) -> Option<AnomalyCheck> {
    let points = series.points();
    let latest = points.first()?;

    let priors: Vec<f64> = points
        .iter()
        .skip(1)
        .take(BASELINE_WINDOW)
        .map(|p| p.value)
        .collect();
    if priors.len() < MIN_BASELINE_SAMPLES {
        return None;
    }

    let baseline = mean(&priors);
    Some(AnomalyCheck {
        value: latest.value,
        baseline,
        threshold,
        is_anomaly: is_anomaly(latest.value, baseline, threshold),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
