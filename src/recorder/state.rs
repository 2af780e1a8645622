//! Recording state management
//!
//! Defines the recording state machine states, session tracking, and the
//! recorder configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::capture::Frame;

/// Current state of the recording state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No motion event in progress
    Idle,
    /// Motion observed on the most recent frame
    Active,
    /// Session still open but motion currently absent
    Cooldown,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// One motion event in progress
///
/// At most one session exists at a time. It is owned exclusively by the
/// coordinator and mutated only on the ingestion path.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session id, carried through to the analysis result
    pub id: Uuid,

    /// Capture timestamp of the frame that opened the session
    pub started_at: Instant,

    /// Wall-clock time the session opened
    pub started_wall: DateTime<Utc>,

    /// Capture timestamp of the last frame classified as motion
    pub last_motion_at: Instant,
}

impl Session {
    /// Open a session at the given capture instant
    pub fn begin(started_at: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            started_wall: Utc::now(),
            last_motion_at: started_at,
        }
    }
}

/// A closed session's frames, detached for hand-off to the dispatcher
#[derive(Debug, Clone)]
pub struct FinalizedClip {
    /// Id of the session this clip came from
    pub session_id: Uuid,

    /// Wall-clock time the session opened
    pub started_wall: DateTime<Utc>,

    /// Buffered frames in capture order; never empty
    pub frames: Vec<Frame>,

    /// Elapsed capture time from the first to the last buffered frame
    pub duration: Duration,
}

/// Configuration for the recording state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Minimum elapsed session span before a clip may close
    ///
    /// Rejects momentary noise that triggers a recording which never
    /// sustains.
    pub min_recording_duration: Duration,

    /// Quiet period required before a session closes
    ///
    /// Bridges brief gaps in motion, e.g. a person pausing in frame.
    pub cooldown_threshold: Duration,

    /// Clip cap by frame count; the oldest frames are evicted beyond it
    pub clip_max_frames: Option<usize>,

    /// Clip cap by elapsed capture time from the first buffered frame
    pub clip_max_duration: Option<Duration>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_recording_duration: Duration::from_secs(3),
            cooldown_threshold: Duration::from_secs(2),
            clip_max_frames: Some(300),
            clip_max_duration: None,
        }
    }
}

impl RecorderConfig {
    /// Validate bounds; at least one clip cap must be set
    pub fn validate(&self) -> Result<(), String> {
        if self.clip_max_frames.is_none() && self.clip_max_duration.is_none() {
            return Err("either clipMaxFrames or clipMaxDuration must be set".to_string());
        }
        if self.clip_max_frames == Some(0) {
            return Err("clipMaxFrames must be at least 1".to_string());
        }
        if self.clip_max_duration == Some(Duration::ZERO) {
            return Err("clipMaxDuration must be non-zero".to_string());
        }
        Ok(())
    }
}
