//! Asynchronous analysis dispatch
//!
//! This module implements the bounded hand-off between clip finalization
//! and the external analysis capability:
//! - JobQueue for bounded FIFO buffering with an overflow policy
//! - Dispatcher and its fixed-size worker pool
//! - Analyzer/ResultSink capability traits

pub mod dispatcher;
pub mod queue;
pub mod traits;
pub mod types;

pub use dispatcher::Dispatcher;
pub use queue::JobQueue;
pub use traits::{Analyzer, ResultSink};
pub use types::{
    AnalysisJob, AnalysisOutcome, AnalysisResult, DispatchConfig, DispatchStats, OperationalError,
    OperationalErrorKind, OverflowPolicy, ShutdownPolicy,
};
