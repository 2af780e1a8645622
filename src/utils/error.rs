//! Error types and handling
//!
//! Construction-time errors for the pipeline. Runtime conditions
//! (classifier faults, queue saturation, analysis failures) are not errors
//! at this level; they surface through the result sink so the ingestion
//! path never halts.

use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using MonitorError
pub type MonitorResult<T> = Result<T, MonitorError>;
