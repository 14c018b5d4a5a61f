//! Storage seam for batched imports.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::SagaError;

/// A persistent store that accepts inserts in bulk and can undo them by id.
///
/// `insert_batch` returns one identifier per inserted item, in item order.
/// `remove` deletes exactly the rows with the given identifiers.
#[cfg_attr(test, mockall::automock(type Item = String; type Id = u64;))]
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// The record type being imported.
    type Item: Clone + Send + Sync + 'static;
    /// Identifier assigned by the store to an inserted record.
    type Id: Clone + Send + Sync + Debug + 'static;

    /// Inserts every item, returning the assigned ids in item order.
    async fn insert_batch(&self, items: Vec<Self::Item>) -> Result<Vec<Self::Id>, SagaError>;

    /// Removes the rows with the given ids.
    async fn remove(&self, ids: Vec<Self::Id>) -> Result<(), SagaError>;
}
