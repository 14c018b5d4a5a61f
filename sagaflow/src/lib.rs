//! # Sagaflow
//!
//! Saga execution for multi-step async workflows.
//!
//! Sagaflow runs a unit of work as an ordered list of steps, each pairing an
//! operation with a compensation that undoes it:
//!
//! - **Ordered execution**: steps run one at a time in registration order
//! - **Reverse rollback**: on failure, completed steps are compensated last first
//! - **Bounded retries**: linear, exponential-capped or constant backoff with jitter
//! - **Batched imports**: bulk inserts split into batches that roll back exactly
//! - **Event-driven observability**: lifecycle events through a pluggable sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sagaflow::prelude::*;
//!
//! let mut saga = Saga::new();
//! saga.add_named_step("create_org", create_org, delete_org)
//!     .add_named_step("assign_role", assign_role, revoke_role);
//!
//! let result = saga.run().await;
//! if let Some(error) = result.error() {
//!     eprintln!("onboarding rolled back: {error}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod batch;
pub mod errors;
pub mod events;
pub mod observability;
pub mod reporting;
pub mod retry;
pub mod saga;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{
        split_batches, BatchConfig, BatchPlan, BatchReceipt, BatchStore, BatchedSaga,
    };
    pub use crate::errors::{ErrorKind, SagaError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::reporting::{ErrorReporter, NoOpErrorReporter, TracingErrorReporter};
    pub use crate::retry::{
        with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryPolicy, Sleeper,
        TokioSleeper,
    };
    pub use crate::saga::{RunOutcome, RunResult, Saga, Step};
    pub use crate::utils::{generate_uuid, iso_timestamp};
}
