//! Capture trait definitions
//!
//! Capability seams for the two external collaborators on the ingestion
//! path: the frame source and the per-frame motion classifier. Any concrete
//! implementation (device capture, video decode, mock) can be substituted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::frame::Frame;

/// Per-frame verdict from the motion classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionVerdict {
    /// Whether this frame belongs to a motion event
    pub is_motion: bool,

    /// Intensity/area score reported by the classifier
    pub score: f32,
}

impl MotionVerdict {
    /// Verdict substituted when the classifier fails; never extends a recording
    pub fn quiet() -> Self {
        Self {
            is_motion: false,
            score: 0.0,
        }
    }
}

/// Supplies raw frames on demand
///
/// Returning `None` signals end of stream, a normal terminal condition
/// rather than an error.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Option<Frame>;
}

/// Classifies a single frame as motion or quiet
///
/// Runs inline on the ingestion path, so implementations must be cheap
/// relative to the capture cadence. Classifier state (background models,
/// previous frames) lives behind `&mut self`.
pub trait MotionClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> anyhow::Result<MotionVerdict>;
}
