//! Testing utilities for sagas and batched imports.
//!
//! This module provides:
//! - An in-memory batch store with injectable failures
//! - A flaky operation that fails a set number of times
//! - A shared call log for asserting execution order

mod flaky;
mod log;
mod store;

pub use flaky::FlakyOperation;
pub use log::CallLog;
pub use store::{InMemoryBatchStore, InjectedFailure};
