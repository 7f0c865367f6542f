//! Vitalfuse - reconciliation and learning engine for daily health telemetry
//!
//! Vitalfuse unifies daily health metrics (sleep, steps, heart rate,
//! calories) arriving from two heterogeneous sources, reconciles them into
//! one per-day series per metric, and fits lightweight regression models on
//! the reconciled series:
//! source adaptation → per-metric merge → per-day alignment → feature
//! building → training/selection → persistence, with series analytics
//! alongside.
//!
//! ## Modules
//!
//! - **adapters**: parse raw phone-export and ring-API payloads into
//!   canonical daily series
//! - **merge / align**: reconcile sources under a fixed trust policy and
//!   join metrics into a per-day table
//! - **features / trainer / store**: build matrices, fit and select
//!   regressors, persist them per user
//! - **analytics**: sleep debt, weekday/weekend patterns, trend, anomaly
//!   checks

pub mod adapters;
pub mod align;
pub mod analytics;
pub mod error;
pub mod features;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod trainer;
pub mod types;

pub use error::PipelineError;
pub use pipeline::HealthPipeline;
pub use trainer::{TrainingOutcome, TrainingReport};
pub use types::{
    AlignedDataset, AlignedRow, AnalyticsSummary, Metric, MetricPoint, MetricSeries,
    NormalizedBatch, Source, UnifiedSeries,
};

/// Engine version embedded in persisted model metadata
pub const VITALFUSE_VERSION: &str = env!("CARGO_PKG_VERSION");
