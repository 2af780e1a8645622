//! Recording coordinator
//!
//! Owns the single active session and drives the Idle/Active/Cooldown state
//! machine from per-frame classifier verdicts. All timing decisions use the
//! frames' capture timestamps, never the wall clock, so behavior is
//! independent of processing latency and fully deterministic under test.

use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::clip::ClipBuffer;
use super::state::{FinalizedClip, RecorderConfig, RecorderState, Session};
use crate::capture::{Frame, MotionVerdict};
use crate::utils::error::{MonitorError, MonitorResult};

/// Events emitted as sessions open and close
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// A new session opened on a motion frame
    SessionStarted { session_id: Uuid },
    /// A session closed and its clip was detached for analysis
    SessionFinalized {
        session_id: Uuid,
        frame_count: usize,
        duration: Duration,
    },
}

/// Drives recording state transitions for one camera feed
///
/// At most one session is open at a time; a motion pulse arriving while a
/// session is cooling down extends that session rather than opening a new
/// one.
pub struct RecordingCoordinator {
    /// Recording thresholds and clip caps
    config: RecorderConfig,

    /// Current state of the state machine
    state: RecorderState,

    /// The open session, if any
    session: Option<Session>,

    /// Frames buffered for the open session
    clip: ClipBuffer,

    /// Sessions opened over the coordinator's lifetime
    sessions_started: u64,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl RecordingCoordinator {
    /// Create a coordinator with a validated configuration
    pub fn new(config: RecorderConfig) -> MonitorResult<Self> {
        config.validate().map_err(MonitorError::InvalidConfig)?;

        let (event_tx, _) = broadcast::channel(100);
        let clip = ClipBuffer::new(config.clip_max_frames, config.clip_max_duration);

        Ok(Self {
            config,
            state: RecorderState::Idle,
            session: None,
            clip,
            sessions_started: 0,
            event_tx,
        })
    }

    /// Get the current recording state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Id of the currently open session, if any
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Sessions opened over the coordinator's lifetime
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    /// Feed one classified frame through the state machine
    ///
    /// Returns a clip when this frame caused the session to finalize. The
    /// finalizing frame itself is quiet footage past the event and is not
    /// part of the clip.
    pub fn observe(&mut self, frame: Frame, verdict: MotionVerdict) -> Option<FinalizedClip> {
        let now = frame.captured_at();

        if self.session.is_none() {
            if !verdict.is_motion {
                // Quiet frame outside any session; not part of a clip.
                return None;
            }

            let session = Session::begin(now);
            tracing::info!(
                "Motion started (score {:.2}), recording session {}",
                verdict.score,
                session.id
            );
            let _ = self.event_tx.send(RecorderEvent::SessionStarted {
                session_id: session.id,
            });

            self.sessions_started += 1;
            self.session = Some(session);
            self.clip.append(frame);
            self.state = RecorderState::Active;
            return None;
        }

        let session = self.session.as_mut()?;

        if verdict.is_motion {
            // Motion during an open session extends it and cancels any
            // pending cooldown.
            session.last_motion_at = now;
            self.state = RecorderState::Active;
            self.clip.append(frame);
            return None;
        }

        self.state = RecorderState::Cooldown;
        let quiet_for = now.duration_since(session.last_motion_at);
        let elapsed = now.duration_since(session.started_at);

        if quiet_for > self.config.cooldown_threshold
            && elapsed > self.config.min_recording_duration
        {
            return self.close_session();
        }

        // Frames during the lull are retained so the tail of the action is
        // not truncated.
        self.clip.append(frame);
        None
    }

    /// Finalize immediately, regardless of the minimum recording duration
    ///
    /// Used when the stream ends or a stop signal arrives so buffered
    /// footage is not lost on shutdown. No-op when idle; safe to call more
    /// than once.
    pub fn flush(&mut self) -> Option<FinalizedClip> {
        self.close_session()
    }

    /// Close the open session and detach its buffered frames
    fn close_session(&mut self) -> Option<FinalizedClip> {
        let session = self.session.take()?;
        self.state = RecorderState::Idle;

        let frames = self.clip.snapshot_and_clear();
        debug_assert!(
            !frames.is_empty(),
            "finalized session {} with an empty clip buffer",
            session.id
        );
        let duration = match (frames.first(), frames.last()) {
            (Some(first), Some(last)) => last.captured_at().duration_since(first.captured_at()),
            _ => Duration::ZERO,
        };

        tracing::info!(
            "Recording stopped for session {}: {} frames over {:.2}s",
            session.id,
            frames.len(),
            duration.as_secs_f64()
        );
        let _ = self.event_tx.send(RecorderEvent::SessionFinalized {
            session_id: session.id,
            frame_count: frames.len(),
            duration,
        });

        Some(FinalizedClip {
            session_id: session.id,
            started_wall: session.started_wall,
            frames,
            duration,
        })
    }
}
