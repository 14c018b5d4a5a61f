//! Bulk imports as one saga step per batch.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

use super::plan::{Batch, BatchConfig, BatchPlan};
use super::store::BatchStore;
use crate::errors::SagaError;
use crate::events::{EventSink, NoOpEventSink};
use crate::retry::RetryPolicy;
use crate::saga::{RunResult, Saga, Step};

/// What one batch committed.
///
/// Produced by the batch's operation and handed, unchanged, to that same
/// batch's compensation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt<Id> {
    /// 0-based batch position.
    pub index: usize,
    /// Positions of the batch's items in the full input.
    pub item_range: Range<usize>,
    /// Ids the store assigned, in item order.
    pub ids: Vec<Id>,
}

impl<Id> BatchReceipt<Id> {
    /// Number of committed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the batch committed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<Id: Clone> RunResult<BatchReceipt<Id>> {
    /// All committed ids in batch order; empty unless the import succeeded.
    #[must_use]
    pub fn committed_ids(&self) -> Vec<Id> {
        self.results()
            .map(|receipts| {
                receipts
                    .iter()
                    .flat_map(|receipt| receipt.ids.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of committed rows; zero unless the import succeeded.
    #[must_use]
    pub fn items_committed(&self) -> usize {
        self.results()
            .map_or(0, |receipts| receipts.iter().map(BatchReceipt::len).sum())
    }
}

/// Splits a bulk import into batches, each registered as one saga step.
///
/// A failing batch rolls back every earlier batch. Each compensation removes
/// exactly the ids its own batch committed, so the rollback stays correct
/// even when batch inserts are retried.
pub struct BatchedSaga<S: BatchStore> {
    store: Arc<S>,
    batch_size: usize,
    retry: Option<RetryPolicy>,
    sink: Arc<dyn EventSink>,
}

impl<S> BatchedSaga<S>
where
    S: BatchStore + 'static,
{
    /// Creates a batched saga over `store`.
    pub fn new(store: Arc<S>, batch_size: usize) -> Result<Self, SagaError> {
        Self::from_config(store, &BatchConfig::new(batch_size))
    }

    /// Creates a batched saga from a config.
    pub fn from_config(store: Arc<S>, config: &BatchConfig) -> Result<Self, SagaError> {
        config.validate()?;
        Ok(Self {
            store,
            batch_size: config.batch_size,
            retry: None,
            sink: Arc::new(NoOpEventSink),
        })
    }

    /// Wraps every batch insert in `policy`.
    ///
    /// Terminal store errors are not retried.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Sets the sink used by sagas built through [`import`](Self::import).
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Plans `items` with this saga's batch size.
    pub fn plan(&self, items: Vec<S::Item>) -> Result<BatchPlan<S::Item>, SagaError> {
        BatchPlan::new(items, self.batch_size)
    }

    /// Splits `items` into batches and builds one step per batch, in batch
    /// order, ready to be registered on a [`Saga`].
    pub fn plan_batches(
        &self,
        items: Vec<S::Item>,
    ) -> Result<Vec<Step<BatchReceipt<S::Id>>>, SagaError> {
        Ok(self.steps(self.plan(items)?))
    }

    /// Builds one step per batch of an existing plan, in batch order.
    pub fn steps(&self, plan: BatchPlan<S::Item>) -> Vec<Step<BatchReceipt<S::Id>>> {
        plan.into_batches()
            .into_iter()
            .map(|batch| self.batch_step(batch))
            .collect()
    }

    /// Appends the plan's batch steps to `saga`.
    pub fn register(&self, plan: BatchPlan<S::Item>, saga: &mut Saga<BatchReceipt<S::Id>>) {
        for step in self.steps(plan) {
            saga.push(step);
        }
    }

    /// Plans, registers and runs an import in a fresh saga.
    pub async fn import(
        &self,
        items: Vec<S::Item>,
    ) -> Result<RunResult<BatchReceipt<S::Id>>, SagaError> {
        let plan = self.plan(items)?;
        info!(
            items = plan.len(),
            batches = plan.batch_count(),
            batch_size = self.batch_size,
            "Starting batched import"
        );

        let mut saga = Saga::new().with_event_sink(Arc::clone(&self.sink));
        self.register(plan, &mut saga);
        Ok(saga.run().await)
    }

    fn batch_step(&self, batch: Batch<S::Item>) -> Step<BatchReceipt<S::Id>> {
        let Batch {
            index,
            item_range,
            items,
        } = batch;
        let store = Arc::clone(&self.store);
        let undo_store = Arc::clone(&self.store);
        let retry = self.retry.clone();

        Step::with_output(
            format!("batch-{index}"),
            move || async move {
                let ids = match retry {
                    Some(policy) => {
                        policy
                            .execute_with(
                                || {
                                    let store = Arc::clone(&store);
                                    let items = items.clone();
                                    async move { store.insert_batch(items).await }
                                },
                                SagaError::is_terminal,
                            )
                            .await?
                    }
                    None => store.insert_batch(items).await?,
                };
                debug!(
                    batch = index,
                    start = item_range.start,
                    end = item_range.end,
                    committed = ids.len(),
                    "Batch committed"
                );
                Ok(BatchReceipt {
                    index,
                    item_range,
                    ids,
                })
            },
            move |receipt: BatchReceipt<S::Id>| async move {
                debug!(
                    batch = receipt.index,
                    start = receipt.item_range.start,
                    end = receipt.item_range.end,
                    rows = receipt.ids.len(),
                    "Removing batch"
                );
                undo_store.remove(receipt.ids).await
            },
        )
    }
}

impl<S: BatchStore> fmt::Debug for BatchedSaga<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedSaga")
            .field("batch_size", &self.batch_size)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
