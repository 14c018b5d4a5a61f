//! Partitioning of an import into fixed-size batches.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::errors::SagaError;

/// Batch import configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Items per batch. Must be at least one.
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

impl BatchConfig {
    /// Creates a config with the given batch size.
    #[must_use]
    pub const fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Parses a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, SagaError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SagaError::invalid_config(format!("batch config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the batch size is usable.
    pub fn validate(&self) -> Result<(), SagaError> {
        if self.batch_size == 0 {
            return Err(SagaError::invalid_config("batch_size must be at least 1"));
        }
        Ok(())
    }
}

/// One slice of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<I> {
    /// 0-based batch position.
    pub index: usize,
    /// Positions of this batch's items in the full input.
    pub item_range: Range<usize>,
    /// The items themselves.
    pub items: Vec<I>,
}

/// Items split into consecutive batches of `batch_size`; the last may be shorter.
#[derive(Debug, Clone)]
pub struct BatchPlan<I> {
    items: Vec<I>,
    batch_size: usize,
}

impl<I> BatchPlan<I> {
    /// Creates a plan, rejecting a zero batch size.
    pub fn new(items: Vec<I>, batch_size: usize) -> Result<Self, SagaError> {
        BatchConfig::new(batch_size).validate()?;
        Ok(Self { items, batch_size })
    }

    /// Creates a plan from a config.
    pub fn from_config(items: Vec<I>, config: &BatchConfig) -> Result<Self, SagaError> {
        Self::new(items, config.batch_size)
    }

    /// Returns the total number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there is nothing to import.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the number of batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.batch_size)
    }

    /// Returns `k*B .. k*B + len_k` for batch `k`, or `None` past the end.
    #[must_use]
    pub fn batch_range(&self, index: usize) -> Option<Range<usize>> {
        let start = index.checked_mul(self.batch_size)?;
        if start >= self.items.len() {
            return None;
        }
        let end = start.saturating_add(self.batch_size).min(self.items.len());
        Some(start..end)
    }

    /// Borrows the items of each batch in order.
    pub fn chunks(&self) -> impl Iterator<Item = &[I]> + '_ {
        self.items.chunks(self.batch_size)
    }

    /// Splits the plan into owned batches.
    #[must_use]
    pub fn into_batches(self) -> Vec<Batch<I>> {
        let batch_size = self.batch_size;
        let count = self.batch_count();
        let mut items = self.items.into_iter();

        (0..count)
            .map(|index| {
                let chunk: Vec<I> = items.by_ref().take(batch_size).collect();
                let start = index * batch_size;
                Batch {
                    index,
                    item_range: start..start + chunk.len(),
                    items: chunk,
                }
            })
            .collect()
    }
}

/// Splits `items` into ordered batches of `batch_size`.
///
/// This only partitions the items. For the operation/compensation step per
/// batch, use [`BatchedSaga::plan_batches`](super::BatchedSaga::plan_batches).
pub fn split_batches<I>(items: Vec<I>, batch_size: usize) -> Result<Vec<Batch<I>>, SagaError> {
    Ok(BatchPlan::new(items, batch_size)?.into_batches())
}
