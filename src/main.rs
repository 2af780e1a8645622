//! Demo runner wiring synthetic capabilities through the monitor.
//!
//! Simulates a store-entrance feed: a quiet scene, a burst of motion while
//! someone walks through, then quiet again. The analyzer stands in for the
//! remote vision call and returns an entry/exit count.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clipwatch::dispatch::{AnalysisResult, OperationalError};
use clipwatch::{
    Analyzer, DispatchConfig, Dispatcher, Frame, FrameSource, Monitor, MonitorResult,
    MotionClassifier, MotionVerdict, RecorderConfig, RecordingCoordinator, ResultSink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Synthetic 30 fps feed; pixels go bright while "someone" walks through
struct SyntheticCamera {
    frame_index: u32,
    total_frames: u32,
    epoch: Instant,
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn next_frame(&mut self) -> Option<Frame> {
        if self.frame_index >= self.total_frames {
            return None;
        }
        let index = self.frame_index;
        self.frame_index += 1;

        // Motion between 1 s and 4 s of the feed.
        let level: u8 = if (30..120).contains(&index) { 200 } else { 10 };
        let captured_at = self.epoch + Duration::from_millis(u64::from(index) * 33);
        Some(Frame::new(vec![level; 64], captured_at))
    }
}

/// Mean-brightness threshold classifier
struct BrightnessClassifier {
    threshold: f32,
}

impl MotionClassifier for BrightnessClassifier {
    fn classify(&mut self, frame: &Frame) -> anyhow::Result<MotionVerdict> {
        let pixels = frame.pixels();
        let mean = pixels.iter().map(|&p| f32::from(p)).sum::<f32>() / pixels.len().max(1) as f32;
        Ok(MotionVerdict {
            is_motion: mean > self.threshold,
            score: mean / 255.0,
        })
    }
}

/// Stand-in for the remote vision call
struct SimulatedAnalyzer;

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    async fn analyze(&self, frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(serde_json::json!({
            "entries": 1,
            "exits": 0,
            "frames": frames.len(),
        }))
    }
}

/// Logs everything it receives
struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn on_result(&self, result: AnalysisResult) {
        tracing::info!(
            "Result for session {} ({} frames): {:?}",
            result.session_id,
            result.frame_count,
            result.outcome
        );
    }

    async fn on_operational_error(&self, error: OperationalError) {
        tracing::warn!("Operational error ({:?}): {}", error.kind, error.detail);
    }
}

#[tokio::main]
async fn main() -> MonitorResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting clipwatch demo v{}", env!("CARGO_PKG_VERSION"));

    let source = SyntheticCamera {
        frame_index: 0,
        total_frames: 300,
        epoch: Instant::now(),
    };
    let classifier = BrightnessClassifier { threshold: 64.0 };
    let coordinator = RecordingCoordinator::new(RecorderConfig::default())?;
    let sink: Arc<dyn ResultSink> = Arc::new(LogSink);
    let dispatcher = Dispatcher::spawn(
        DispatchConfig::default(),
        Arc::new(SimulatedAnalyzer),
        sink.clone(),
    )?;

    let report = Monitor::new(source, classifier, coordinator, dispatcher, sink)
        .run()
        .await;

    tracing::info!(
        "Run complete: {} frames ingested, {} clips analyzed",
        report.frames_ingested,
        report.dispatch.completed
    );
    Ok(())
}
