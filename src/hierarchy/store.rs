//! Storage abstraction for closure-table edges.
//!
//! The engine never touches a database handle directly. It opens an
//! [`EdgeTransaction`], reads the parent chain and writes the derived batch
//! through it, and commits or rolls back as one unit.

use async_trait::async_trait;

use super::HierarchyError;
use crate::domain::{AccountId, HierarchyEdge};

#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Opens a transaction for one attach.
    async fn begin(&self) -> Result<Box<dyn EdgeTransaction>, HierarchyError>;

    /// Every edge whose descendant is `descendant`, depth ascending.
    async fn ancestors(&self, descendant: AccountId) -> Result<Vec<HierarchyEdge>, HierarchyError>;

    /// Every edge whose ancestor is `ancestor`, depth ascending then
    /// descendant id, limited to `depth <= max_depth` when given.
    async fn descendants(
        &self,
        ancestor: AccountId,
        max_depth: Option<u32>,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError>;

    /// Whether the exact `(ancestor, descendant)` pair is recorded.
    async fn contains(
        &self,
        ancestor: AccountId,
        descendant: AccountId,
    ) -> Result<bool, HierarchyError>;
}

#[async_trait]
pub trait EdgeTransaction: Send {
    /// Edges ending at `descendant` as seen inside this transaction.
    async fn chain_of(&mut self, descendant: AccountId)
    -> Result<Vec<HierarchyEdge>, HierarchyError>;

    /// Inserts all `edges` in one statement.
    ///
    /// Fails with [`HierarchyError::DuplicateEdge`] when any pair exists.
    async fn insert_batch(&mut self, edges: &[HierarchyEdge]) -> Result<u64, HierarchyError>;

    async fn commit(self: Box<Self>) -> Result<(), HierarchyError>;

    async fn rollback(self: Box<Self>) -> Result<(), HierarchyError>;
}
