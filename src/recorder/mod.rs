//! Recording system module
//!
//! This module implements the event-triggered recording architecture:
//! - ClipBuffer for bounded frame retention
//! - RecordingCoordinator for the Idle/Active/Cooldown state machine
//! - Session tracking and finalized clip hand-off

pub mod clip;
pub mod coordinator;
pub mod state;

pub use clip::ClipBuffer;
pub use coordinator::{RecorderEvent, RecordingCoordinator};
pub use state::{FinalizedClip, RecorderConfig, RecorderState, Session};
