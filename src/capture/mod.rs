//! Frame type and ingestion-side capability traits
//!
//! This module defines the frame value type and the seams through which
//! frames and motion verdicts enter the pipeline.

pub mod frame;
pub mod traits;

// Re-export the public capture surface
pub use frame::Frame;
pub use traits::{FrameSource, MotionClassifier, MotionVerdict};
