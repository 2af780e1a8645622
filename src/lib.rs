//! Clipwatch - motion-triggered clip capture for edge cameras.
//!
//! Ingests a continuous stream of frames from a fixed camera, segments
//! sustained motion into bounded clips, and hands each clip to an
//! asynchronous analysis pipeline without ever stalling frame ingestion.
//!
//! The external collaborators (frame source, motion classifier, analysis
//! service, result consumer) are capability traits, so device capture,
//! remote calls, and test doubles plug in interchangeably. See [`capture`]
//! for the ingestion-side traits and [`dispatch`] for the analysis-side
//! ones; [`monitor::Monitor`] wires everything into a running pipeline.

pub mod capture;
pub mod dispatch;
pub mod monitor;
pub mod recorder;
pub mod utils;

pub use capture::{Frame, FrameSource, MotionClassifier, MotionVerdict};
pub use dispatch::{Analyzer, DispatchConfig, Dispatcher, ResultSink};
pub use monitor::{Monitor, MonitorHandle, MonitorReport};
pub use recorder::{RecorderConfig, RecordingCoordinator};
pub use utils::error::{MonitorError, MonitorResult};
