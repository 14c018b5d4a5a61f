//! Batched imports built on the saga executor.
//!
//! A bulk import is split into fixed-size batches and each batch becomes one
//! saga step. A failure partway through undoes only what was written, through
//! the ordinary saga rollback path.
//!
//! Every batch's operation returns a [`BatchReceipt`] carrying the ids the
//! store assigned, and the saga hands that receipt straight to the same
//! batch's compensation. No shared positional list of ids exists, so the
//! rollback of one batch can never target rows written by another, retried
//! inserts included.

mod plan;
mod saga;
mod store;

pub use plan::{split_batches, Batch, BatchConfig, BatchPlan};
pub use saga::{BatchReceipt, BatchedSaga};
pub use store::BatchStore;
