//! Event sink system for saga telemetry.
//!
//! Sinks are injected into each [`Saga`](crate::saga::Saga); there is no
//! process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event types emitted by the saga executor.
pub mod names {
    /// A run has started.
    pub const SAGA_STARTED: &str = "saga.started";
    /// A step's operation succeeded.
    pub const STEP_COMPLETED: &str = "saga.step.completed";
    /// A step's operation failed; rollback follows.
    pub const STEP_FAILED: &str = "saga.step.failed";
    /// A compensation succeeded.
    pub const COMPENSATION_COMPLETED: &str = "saga.compensation.completed";
    /// A compensation failed; rollback continued.
    pub const COMPENSATION_FAILED: &str = "saga.compensation.failed";
    /// Every step succeeded.
    pub const SAGA_COMPLETED: &str = "saga.completed";
    /// Rollback finished after a step failure.
    pub const SAGA_ROLLED_BACK: &str = "saga.rolled_back";
}
