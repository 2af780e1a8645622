//! Dispatch types and configuration
//!
//! This module defines the analysis job/result model, the dispatcher
//! configuration, and the operational error reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::capture::Frame;

/// Behavior when a clip is submitted to a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Reject the new job and report saturation for it
    ///
    /// Queued footage is older and therefore kept; silently discarding
    /// unanalyzed older clips is worse than losing the newest.
    DropNewest,

    /// Evict the oldest queued job to make room and report saturation for it
    DropOldest,
}

/// Behavior for jobs still queued when the dispatcher shuts down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShutdownPolicy {
    /// Let the workers empty the queue before stopping
    Drain,

    /// Drop queued jobs; only in-flight analyses run to completion
    Discard,
}

/// Configuration for the dispatcher and its worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Maximum concurrently running analysis calls
    pub max_in_flight: usize,

    /// Capacity of the job queue feeding the workers
    pub max_queued_jobs: usize,

    /// What to do when the queue is full
    pub overflow_policy: OverflowPolicy,

    /// Per-job timeout on the external analysis call
    pub analysis_timeout: Duration,

    /// What happens to queued jobs on shutdown
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            max_queued_jobs: 8,
            overflow_policy: OverflowPolicy::DropNewest,
            analysis_timeout: Duration::from_secs(30),
            shutdown_policy: ShutdownPolicy::Drain,
        }
    }
}

impl DispatchConfig {
    /// Validate bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_flight == 0 {
            return Err("maxInFlight must be at least 1".to_string());
        }
        if self.max_queued_jobs == 0 {
            return Err("maxQueuedJobs must be at least 1".to_string());
        }
        if self.analysis_timeout.is_zero() {
            return Err("analysisTimeout must be non-zero".to_string());
        }
        Ok(())
    }
}

/// One finalized clip scheduled for analysis
///
/// Created exactly once per finalized session and consumed by exactly one
/// worker; immutable after creation.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    /// Session the clip came from
    pub session_id: Uuid,

    /// Frames in capture order, ownership taken from the session
    pub frames: Vec<Frame>,

    /// Elapsed capture time covered by the frames
    pub clip_duration: Duration,

    /// Wall-clock time the session opened
    pub started_wall: DateTime<Utc>,

    /// Wall-clock time the job entered the queue
    pub enqueued_at: DateTime<Utc>,
}

/// Outcome of one analysis job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AnalysisOutcome {
    /// The analysis call returned a payload
    Success { payload: serde_json::Value },

    /// The call failed or timed out; not retried here
    Failure { reason: String },
}

/// Result delivered to the sink for one finalized session
///
/// Results may complete out of session order; consumers key on the session
/// id, not arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub session_id: Uuid,
    pub frame_count: usize,
    pub clip_duration: Duration,
    pub outcome: AnalysisOutcome,
}

/// Kinds of non-fatal conditions surfaced through the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationalErrorKind {
    /// The motion classifier failed on a frame; the frame was treated as quiet
    Classifier,

    /// A finalized clip could not be queued; the overflow policy applied
    QueueSaturated,
}

/// Operational warning surfaced through the sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalError {
    pub kind: OperationalErrorKind,
    pub session_id: Option<Uuid>,
    pub detail: String,
}

/// Counters tracking dispatcher activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Clips submitted for analysis
    pub submitted: u64,

    /// Jobs whose analysis call succeeded
    pub completed: u64,

    /// Jobs whose analysis call failed or timed out
    pub failed: u64,

    /// Jobs dropped by the overflow or shutdown policy
    pub dropped: u64,

    /// Jobs currently waiting in the queue
    pub pending: u64,
}
