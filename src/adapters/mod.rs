//! Source payload adapters
//!
//! This module provides adapters that parse raw source payloads and map them
//! to canonical per-metric daily series.

mod phone;
mod ring;

pub use phone::PhoneExportAdapter;
pub use ring::RingApiAdapter;

use crate::error::PipelineError;
use crate::types::NormalizedBatch;

/// Trait for source payload adapters.
///
/// An entirely unparsable payload is an error; individually malformed
/// records inside a valid payload are skipped silently.
pub trait SourceAdapter {
    /// Parse raw JSON into per-metric daily series
    fn parse(&self, raw_json: &str) -> Result<NormalizedBatch, PipelineError>;
}
