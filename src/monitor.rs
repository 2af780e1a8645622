//! End-to-end monitor
//!
//! Wires the frame source, motion classifier, recording coordinator, and
//! dispatcher into the single ingestion loop. The loop blocks only on the
//! frame source; classification and state transitions run inline, and
//! finalized clips are handed to the dispatcher without waiting on
//! analysis.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::{FrameSource, MotionClassifier, MotionVerdict};
use crate::dispatch::{
    DispatchStats, Dispatcher, OperationalError, OperationalErrorKind, ResultSink,
};
use crate::recorder::RecordingCoordinator;

/// Summary of a completed monitoring run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    /// Frames pulled from the source
    pub frames_ingested: u64,

    /// Frames the classifier failed on (treated as quiet)
    pub classifier_errors: u64,

    /// Sessions opened by the state machine
    pub sessions_started: u64,

    /// Clips handed to the dispatcher, including the shutdown flush
    pub clips_dispatched: u64,

    /// Final dispatcher counters
    pub dispatch: DispatchStats,
}

/// Requests a monitor to stop from outside the ingestion loop
#[derive(Clone)]
pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Ask the ingestion loop to stop; any open session is finalized
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Single-camera monitoring pipeline
pub struct Monitor<S, C> {
    source: S,
    classifier: C,
    coordinator: RecordingCoordinator,
    dispatcher: Dispatcher,
    sink: Arc<dyn ResultSink>,
    stop: Arc<AtomicBool>,
}

impl<S: FrameSource, C: MotionClassifier> Monitor<S, C> {
    pub fn new(
        source: S,
        classifier: C,
        coordinator: RecordingCoordinator,
        dispatcher: Dispatcher,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            source,
            classifier,
            coordinator,
            dispatcher,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting a stop from another task
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            stop: self.stop.clone(),
        }
    }

    /// Run until the frame source is exhausted or a stop is requested
    pub async fn run(mut self) -> MonitorReport {
        tracing::info!("Monitor started");

        let mut frames_ingested = 0u64;
        let mut classifier_errors = 0u64;
        let mut clips_dispatched = 0u64;

        while !self.stop.load(Ordering::Relaxed) {
            let Some(frame) = self.source.next_frame().await else {
                tracing::info!("Frame source exhausted");
                break;
            };
            frames_ingested += 1;

            let verdict = match self.classifier.classify(&frame) {
                Ok(verdict) => verdict,
                Err(err) => {
                    // Fail safe toward not extending a recording; the
                    // ingestion path never halts on classifier errors.
                    classifier_errors += 1;
                    tracing::warn!("Classifier error, treating frame as quiet: {:#}", err);
                    self.report_classifier_error(err.to_string());
                    MotionVerdict::quiet()
                }
            };

            if let Some(clip) = self.coordinator.observe(frame, verdict) {
                clips_dispatched += 1;
                self.dispatcher.submit(clip);
            }
        }

        // Stream over: finalize whatever is buffered so captured footage is
        // not lost, regardless of the minimum recording duration.
        if let Some(clip) = self.coordinator.flush() {
            clips_dispatched += 1;
            self.dispatcher.submit(clip);
        }
        self.dispatcher.shutdown().await;

        let report = MonitorReport {
            frames_ingested,
            classifier_errors,
            sessions_started: self.coordinator.sessions_started(),
            clips_dispatched,
            dispatch: self.dispatcher.stats(),
        };
        tracing::info!(
            "Monitor stopped: {} frames, {} sessions, {} clips dispatched",
            report.frames_ingested,
            report.sessions_started,
            report.clips_dispatched
        );
        report
    }

    /// Report from a spawned task so the ingestion loop never awaits sink I/O
    fn report_classifier_error(&self, detail: String) {
        let sink = self.sink.clone();
        let error = OperationalError {
            kind: OperationalErrorKind::Classifier,
            session_id: self.coordinator.session_id(),
            detail,
        };
        tokio::spawn(async move {
            sink.on_operational_error(error).await;
        });
    }
}
