//! Error types for the vitalfuse pipeline

use thiserror::Error;

/// Errors that can occur during ingestion, training, or persistence.
///
/// Insufficient data and missing models are deliberately not represented
/// here; those are ordinary result values the caller branches on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to parse source payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model fit failed: {0}")]
    FitError(String),

    #[error("Model persistence failed: {0}")]
    PersistenceError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
