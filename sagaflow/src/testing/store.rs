//! In-memory batch store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::batch::BatchStore;
use crate::errors::SagaError;

/// Kind of failure to inject into a store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Fails with [`SagaError::Retryable`].
    Retryable,
    /// Fails with [`SagaError::Terminal`].
    Terminal,
}

impl InjectedFailure {
    fn to_error(self, message: String) -> SagaError {
        match self {
            Self::Retryable => SagaError::retryable_msg(message),
            Self::Terminal => SagaError::terminal_msg(message),
        }
    }
}

#[derive(Debug)]
struct State<I> {
    next_id: u64,
    rows: BTreeMap<u64, I>,
    insert_calls: usize,
    inserted: Vec<Vec<u64>>,
    removed: Vec<Vec<u64>>,
    insert_failures: HashMap<usize, InjectedFailure>,
    fail_removals: bool,
}

/// A [`BatchStore`] backed by a map, assigning ids from 1 upward.
///
/// A failed insert writes nothing.
#[derive(Debug)]
pub struct InMemoryBatchStore<I> {
    state: Mutex<State<I>>,
}

impl<I> Default for InMemoryBatchStore<I> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                rows: BTreeMap::new(),
                insert_calls: 0,
                inserted: Vec::new(),
                removed: Vec::new(),
                insert_failures: HashMap::new(),
                fail_removals: false,
            }),
        }
    }
}

impl<I: Clone> InMemoryBatchStore<I> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the insert call with the given 0-based number fail.
    pub fn fail_insert_call(&self, call: usize, failure: InjectedFailure) {
        self.state.lock().insert_failures.insert(call, failure);
    }

    /// Makes every removal fail.
    pub fn fail_removals(&self, fail: bool) {
        self.state.lock().fail_removals = fail;
    }

    /// Number of insert calls, failed ones included.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.state.lock().insert_calls
    }

    /// Ids assigned by each successful insert, in call order.
    #[must_use]
    pub fn inserted_batches(&self) -> Vec<Vec<u64>> {
        self.state.lock().inserted.clone()
    }

    /// Ids passed to each successful removal, in call order.
    #[must_use]
    pub fn removed_batches(&self) -> Vec<Vec<u64>> {
        self.state.lock().removed.clone()
    }

    /// Ids currently stored.
    #[must_use]
    pub fn live_ids(&self) -> Vec<u64> {
        self.state.lock().rows.keys().copied().collect()
    }

    /// Items currently stored, in id order.
    #[must_use]
    pub fn live_items(&self) -> Vec<I> {
        self.state.lock().rows.values().cloned().collect()
    }
}

#[async_trait]
impl<I> BatchStore for InMemoryBatchStore<I>
where
    I: Clone + Send + Sync + 'static,
{
    type Item = I;
    type Id = u64;

    async fn insert_batch(&self, items: Vec<I>) -> Result<Vec<u64>, SagaError> {
        let mut state = self.state.lock();
        let call = state.insert_calls;
        state.insert_calls += 1;

        if let Some(failure) = state.insert_failures.remove(&call) {
            return Err(failure.to_error(format!("insert call {call} rejected")));
        }

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = state.next_id;
            state.next_id += 1;
            state.rows.insert(id, item);
            ids.push(id);
        }
        state.inserted.push(ids.clone());
        Ok(ids)
    }

    async fn remove(&self, ids: Vec<u64>) -> Result<(), SagaError> {
        let mut state = self.state.lock();
        if state.fail_removals {
            return Err(SagaError::terminal_msg(format!(
                "removal of {} rows rejected",
                ids.len()
            )));
        }
        for id in &ids {
            state.rows.remove(id);
        }
        state.removed.push(ids);
        Ok(())
    }
}
