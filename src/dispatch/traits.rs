//! Analysis-side capability traits
//!
//! Seams for the external analysis service and the consumer of its results.
//! The analysis call is bound by the dispatcher's configured timeout; retry
//! policy, if any, is layered on top of the sink's failure handling rather
//! than implemented here.

use async_trait::async_trait;

use super::types::{AnalysisResult, OperationalError};
use crate::capture::Frame;

/// Invokes the external analysis capability on a finalized clip
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, frames: &[Frame]) -> anyhow::Result<serde_json::Value>;
}

/// Receives analysis results and operational warnings
///
/// Results may arrive out of session order depending on external call
/// latency; implementations must key on the session id.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn on_result(&self, result: AnalysisResult);
    async fn on_operational_error(&self, error: OperationalError);
}
