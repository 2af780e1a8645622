//! Clip dispatch and the analysis worker pool
//!
//! Accepts finalized clips from the ingestion path and schedules their
//! analysis on a bounded worker pool. `submit` never blocks and never
//! awaits, so analysis latency is fully isolated from frame ingestion.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::queue::{JobQueue, PushOutcome};
use super::traits::{Analyzer, ResultSink};
use super::types::{
    AnalysisJob, AnalysisOutcome, AnalysisResult, DispatchConfig, DispatchStats, OperationalError,
    OperationalErrorKind, ShutdownPolicy,
};
use crate::recorder::FinalizedClip;
use crate::utils::error::{MonitorError, MonitorResult};

/// Schedules finalized clips onto a bounded pool of analysis workers
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    workers: Vec<JoinHandle<()>>,
    sink: Arc<dyn ResultSink>,
    stats: Arc<Mutex<DispatchStats>>,
    shutdown_policy: ShutdownPolicy,
    shut_down: bool,
}

impl Dispatcher {
    /// Validate the configuration and spawn the worker pool
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        config: DispatchConfig,
        analyzer: Arc<dyn Analyzer>,
        sink: Arc<dyn ResultSink>,
    ) -> MonitorResult<Self> {
        config.validate().map_err(MonitorError::InvalidConfig)?;

        let queue = Arc::new(JobQueue::new(config.max_queued_jobs, config.overflow_policy));
        let stats = Arc::new(Mutex::new(DispatchStats::default()));

        let workers = (0..config.max_in_flight)
            .map(|worker_id| {
                let queue = queue.clone();
                let analyzer = analyzer.clone();
                let sink = sink.clone();
                let stats = stats.clone();
                let analysis_timeout = config.analysis_timeout;
                tokio::spawn(async move {
                    worker_loop(worker_id, queue, analyzer, sink, stats, analysis_timeout).await;
                })
            })
            .collect();

        tracing::info!(
            "Dispatcher started: {} workers, queue capacity {}",
            config.max_in_flight,
            config.max_queued_jobs
        );

        Ok(Self {
            queue,
            workers,
            sink,
            stats,
            shutdown_policy: config.shutdown_policy,
            shut_down: false,
        })
    }

    /// Schedule a finalized clip for analysis without blocking
    pub fn submit(&self, clip: FinalizedClip) {
        let job = AnalysisJob {
            session_id: clip.session_id,
            clip_duration: clip.duration,
            started_wall: clip.started_wall,
            frames: clip.frames,
            enqueued_at: chrono::Utc::now(),
        };
        self.stats.lock().submitted += 1;

        match self.queue.push(job) {
            PushOutcome::Queued => {}
            PushOutcome::RejectedNewest(rejected) => {
                self.stats.lock().dropped += 1;
                tracing::warn!(
                    "Analysis queue saturated, dropping newest clip (session {})",
                    rejected.session_id
                );
                self.report_saturation(rejected.session_id, "queue full, newest clip dropped");
            }
            PushOutcome::EvictedOldest(evicted) => {
                self.stats.lock().dropped += 1;
                tracing::warn!(
                    "Analysis queue saturated, evicted oldest clip (session {})",
                    evicted.session_id
                );
                self.report_saturation(evicted.session_id, "queue full, oldest clip evicted");
            }
            PushOutcome::Closed(rejected) => {
                self.stats.lock().dropped += 1;
                tracing::warn!(
                    "Dispatcher already shut down, dropping clip (session {})",
                    rejected.session_id
                );
            }
        }
    }

    /// Snapshot of the dispatch counters
    pub fn stats(&self) -> DispatchStats {
        let mut stats = self.stats.lock().clone();
        stats.pending = self.queue.len() as u64;
        stats
    }

    /// Stop the workers per the configured shutdown policy; idempotent
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if self.shutdown_policy == ShutdownPolicy::Discard {
            let discarded = self.queue.clear();
            if discarded > 0 {
                self.stats.lock().dropped += discarded as u64;
                tracing::warn!("Discarding {} queued analysis jobs on shutdown", discarded);
            }
        }

        self.queue.close();
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        tracing::info!("Dispatcher shut down");
    }

    /// Report saturation from a spawned task so the caller never awaits sink I/O
    fn report_saturation(&self, session_id: Uuid, detail: &str) {
        let sink = self.sink.clone();
        let error = OperationalError {
            kind: OperationalErrorKind::QueueSaturated,
            session_id: Some(session_id),
            detail: detail.to_string(),
        };
        tokio::spawn(async move {
            sink.on_operational_error(error).await;
        });
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<JobQueue>,
    analyzer: Arc<dyn Analyzer>,
    sink: Arc<dyn ResultSink>,
    stats: Arc<Mutex<DispatchStats>>,
    analysis_timeout: Duration,
) {
    tracing::debug!("Analysis worker {} started", worker_id);

    while let Some(job) = queue.pop().await {
        let session_id = job.session_id;
        let frame_count = job.frames.len();
        tracing::info!(
            "Worker {}: analyzing {} frames for session {}",
            worker_id,
            frame_count,
            session_id
        );

        let outcome =
            match tokio::time::timeout(analysis_timeout, analyzer.analyze(&job.frames)).await {
                Ok(Ok(payload)) => AnalysisOutcome::Success { payload },
                Ok(Err(err)) => AnalysisOutcome::Failure {
                    reason: err.to_string(),
                },
                Err(_) => AnalysisOutcome::Failure {
                    reason: format!(
                        "analysis timed out after {:.1}s",
                        analysis_timeout.as_secs_f64()
                    ),
                },
            };

        match &outcome {
            AnalysisOutcome::Success { .. } => {
                stats.lock().completed += 1;
                tracing::info!("Worker {}: session {} analyzed", worker_id, session_id);
            }
            AnalysisOutcome::Failure { reason } => {
                stats.lock().failed += 1;
                tracing::error!(
                    "Worker {}: analysis failed for session {}: {}",
                    worker_id,
                    session_id,
                    reason
                );
            }
        }

        sink.on_result(AnalysisResult {
            session_id,
            frame_count,
            clip_duration: job.clip_duration,
            outcome,
        })
        .await;
    }

    tracing::debug!("Analysis worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::dispatch::types::OverflowPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::sync::{mpsc, Semaphore};
    use uuid::Uuid;

    fn clip(frame_count: usize) -> FinalizedClip {
        let epoch = Instant::now();
        let frames = (0..frame_count)
            .map(|i| Frame::new(vec![0u8; 4], epoch + Duration::from_millis(i as u64 * 33)))
            .collect();
        FinalizedClip {
            session_id: Uuid::new_v4(),
            started_wall: chrono::Utc::now(),
            frames,
            duration: Duration::from_millis(frame_count.saturating_sub(1) as u64 * 33),
        }
    }

    fn test_config(workers: usize, capacity: usize, policy: OverflowPolicy) -> DispatchConfig {
        DispatchConfig {
            max_in_flight: workers,
            max_queued_jobs: capacity,
            overflow_policy: policy,
            analysis_timeout: Duration::from_secs(60),
            shutdown_policy: ShutdownPolicy::Drain,
        }
    }

    /// Records everything it receives on unbounded channels
    struct ChannelSink {
        results: mpsc::UnboundedSender<AnalysisResult>,
        errors: mpsc::UnboundedSender<OperationalError>,
    }

    fn channel_sink() -> (
        Arc<ChannelSink>,
        mpsc::UnboundedReceiver<AnalysisResult>,
        mpsc::UnboundedReceiver<OperationalError>,
    ) {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        (
            Arc::new(ChannelSink {
                results: results_tx,
                errors: errors_tx,
            }),
            results_rx,
            errors_rx,
        )
    }

    #[async_trait]
    impl ResultSink for ChannelSink {
        async fn on_result(&self, result: AnalysisResult) {
            let _ = self.results.send(result);
        }
        async fn on_operational_error(&self, error: OperationalError) {
            let _ = self.errors.send(error);
        }
    }

    /// Succeeds immediately, echoing the frame count
    struct EchoAnalyzer;

    #[async_trait]
    impl Analyzer for EchoAnalyzer {
        async fn analyze(&self, frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({ "frames": frames.len() }))
        }
    }

    /// Signals entry, then blocks until the gate releases a permit
    struct GatedAnalyzer {
        entered: mpsc::UnboundedSender<()>,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Analyzer for GatedAnalyzer {
        async fn analyze(&self, _frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
            let _ = self.entered.send(());
            let _permit = self.gate.acquire().await.unwrap();
            Ok(serde_json::json!({}))
        }
    }

    /// Tracks how many analyze calls run concurrently
    struct CountingAnalyzer {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for CountingAnalyzer {
        async fn analyze(&self, _frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(serde_json::json!({}))
        }
    }

    #[tokio::test]
    async fn results_are_delivered_keyed_by_session() {
        let (sink, mut results_rx, _errors_rx) = channel_sink();
        let mut dispatcher = Dispatcher::spawn(
            test_config(2, 8, OverflowPolicy::DropNewest),
            Arc::new(EchoAnalyzer),
            sink,
        )
        .unwrap();

        let first = clip(3);
        let second = clip(5);
        let expected = [first.session_id, second.session_id];
        dispatcher.submit(first);
        dispatcher.submit(second);
        dispatcher.shutdown().await;

        let mut seen = Vec::new();
        while let Ok(result) = results_rx.try_recv() {
            assert!(matches!(result.outcome, AnalysisOutcome::Success { .. }));
            seen.push((result.session_id, result.frame_count));
        }
        seen.sort_by_key(|(id, _)| expected.iter().position(|e| e == id));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (expected[0], 3));
        assert_eq!(seen[1], (expected[1], 5));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_max_in_flight() {
        let (sink, _results_rx, _errors_rx) = channel_sink();
        let analyzer = Arc::new(CountingAnalyzer {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut dispatcher = Dispatcher::spawn(
            test_config(2, 8, OverflowPolicy::DropNewest),
            analyzer.clone(),
            sink,
        )
        .unwrap();

        for _ in 0..6 {
            dispatcher.submit(clip(1));
        }
        dispatcher.shutdown().await;

        assert!(analyzer.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(dispatcher.stats().completed, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_analysis_is_reported_as_failure() {
        let (sink, mut results_rx, _errors_rx) = channel_sink();

        struct SlowAnalyzer;
        #[async_trait]
        impl Analyzer for SlowAnalyzer {
            async fn analyze(&self, _frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(serde_json::json!({}))
            }
        }

        let config = DispatchConfig {
            analysis_timeout: Duration::from_secs(1),
            ..test_config(1, 4, OverflowPolicy::DropNewest)
        };
        let mut dispatcher = Dispatcher::spawn(config, Arc::new(SlowAnalyzer), sink).unwrap();

        let submitted = clip(2);
        let session_id = submitted.session_id;
        dispatcher.submit(submitted);
        dispatcher.shutdown().await;

        let result = results_rx.recv().await.unwrap();
        assert_eq!(result.session_id, session_id);
        match result.outcome {
            AnalysisOutcome::Failure { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected Failure, got {:?}", other),
        }
        assert_eq!(dispatcher.stats().failed, 1);
    }

    #[tokio::test]
    async fn failed_analysis_is_reported_not_retried() {
        let (sink, mut results_rx, _errors_rx) = channel_sink();

        struct FailingAnalyzer;
        #[async_trait]
        impl Analyzer for FailingAnalyzer {
            async fn analyze(&self, _frames: &[Frame]) -> anyhow::Result<serde_json::Value> {
                Err(anyhow::anyhow!("service unavailable"))
            }
        }

        let mut dispatcher = Dispatcher::spawn(
            test_config(1, 4, OverflowPolicy::DropNewest),
            Arc::new(FailingAnalyzer),
            sink,
        )
        .unwrap();

        dispatcher.submit(clip(2));
        dispatcher.shutdown().await;

        let result = results_rx.recv().await.unwrap();
        match result.outcome {
            AnalysisOutcome::Failure { reason } => assert!(reason.contains("service unavailable")),
            other => panic!("expected Failure, got {:?}", other),
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.submitted, 1, "failed jobs are not re-queued");
    }

    #[tokio::test]
    async fn drop_newest_reports_saturation_for_the_submitted_session() {
        let (results_tx, _results_rx) = mpsc::unbounded_channel();
        let (errors_tx, mut errors_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink {
            results: results_tx,
            errors: errors_tx,
        });
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let analyzer = Arc::new(GatedAnalyzer {
            entered: entered_tx,
            gate: gate.clone(),
        });

        let mut dispatcher = Dispatcher::spawn(
            test_config(1, 1, OverflowPolicy::DropNewest),
            analyzer,
            sink,
        )
        .unwrap();

        // First clip goes in-flight, second fills the queue, third overflows.
        dispatcher.submit(clip(1));
        entered_rx.recv().await.unwrap();
        dispatcher.submit(clip(1));

        let overflowing = clip(1);
        let overflowing_id = overflowing.session_id;
        dispatcher.submit(overflowing);

        let error = errors_rx.recv().await.unwrap();
        assert_eq!(error.kind, OperationalErrorKind::QueueSaturated);
        assert_eq!(error.session_id, Some(overflowing_id));

        gate.add_permits(8);
        dispatcher.shutdown().await;

        let stats = dispatcher.stats();
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.completed, 2);
    }

    #[tokio::test]
    async fn drop_oldest_reports_saturation_for_the_evicted_session() {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let (errors_tx, mut errors_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink {
            results: results_tx,
            errors: errors_tx,
        });
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let analyzer = Arc::new(GatedAnalyzer {
            entered: entered_tx,
            gate: gate.clone(),
        });

        let mut dispatcher = Dispatcher::spawn(
            test_config(1, 1, OverflowPolicy::DropOldest),
            analyzer,
            sink,
        )
        .unwrap();

        let in_flight = clip(1);
        let in_flight_id = in_flight.session_id;
        dispatcher.submit(in_flight);
        entered_rx.recv().await.unwrap();

        let queued = clip(1);
        let queued_id = queued.session_id;
        dispatcher.submit(queued);

        let newest = clip(1);
        let newest_id = newest.session_id;
        dispatcher.submit(newest);

        let error = errors_rx.recv().await.unwrap();
        assert_eq!(error.kind, OperationalErrorKind::QueueSaturated);
        assert_eq!(error.session_id, Some(queued_id), "the evicted job is reported");

        gate.add_permits(8);
        dispatcher.shutdown().await;

        let mut analyzed = Vec::new();
        while let Ok(result) = results_rx.try_recv() {
            analyzed.push(result.session_id);
        }
        analyzed.sort();
        let mut expected = vec![in_flight_id, newest_id];
        expected.sort();
        assert_eq!(analyzed, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn discard_shutdown_drops_queued_jobs() {
        let (sink, mut results_rx, _errors_rx) = channel_sink();
        let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let analyzer = Arc::new(GatedAnalyzer {
            entered: entered_tx,
            gate: gate.clone(),
        });

        let config = DispatchConfig {
            shutdown_policy: ShutdownPolicy::Discard,
            ..test_config(1, 4, OverflowPolicy::DropNewest)
        };
        let mut dispatcher = Dispatcher::spawn(config, analyzer, sink).unwrap();

        let in_flight = clip(1);
        let in_flight_id = in_flight.session_id;
        dispatcher.submit(in_flight);
        entered_rx.recv().await.unwrap();
        dispatcher.submit(clip(1));

        // Release the in-flight job once shutdown is underway.
        let releaser = {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                gate.add_permits(8);
            })
        };

        dispatcher.shutdown().await;
        releaser.await.unwrap();

        let stats = dispatcher.stats();
        assert_eq!(stats.completed, 1, "only the in-flight job completes");
        assert_eq!(stats.dropped, 1, "the queued job is discarded");

        let result = results_rx.recv().await.unwrap();
        assert_eq!(result.session_id, in_flight_id);
        assert!(results_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (sink, _results_rx, _errors_rx) = channel_sink();
        let mut dispatcher = Dispatcher::spawn(
            test_config(1, 4, OverflowPolicy::DropNewest),
            Arc::new(EchoAnalyzer),
            sink,
        )
        .unwrap();

        dispatcher.shutdown().await;
        dispatcher.shutdown().await;
        assert_eq!(dispatcher.stats().submitted, 0);
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let (sink, _results_rx, _errors_rx) = channel_sink();
        let config = test_config(0, 4, OverflowPolicy::DropNewest);

        assert!(matches!(
            Dispatcher::spawn(config, Arc::new(EchoAnalyzer), sink),
            Err(MonitorError::InvalidConfig(_))
        ));
    }
}
