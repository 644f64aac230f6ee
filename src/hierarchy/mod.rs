//! Referral hierarchy maintained as a closure table.
//!
//! Every attached account owns one row per ancestor (itself included at depth
//! 0). Attaching a child copies the parent's rows with the depth bumped by
//! one, so ancestor and descendant lookups are single range scans.

pub mod store;

pub use store::{EdgeStore, EdgeTransaction};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{AccountId, HierarchyEdge, Relative};

#[derive(Debug, Error)]
pub enum HierarchyError {
    /// An inserted pair already exists: attach ran twice for the account.
    #[error("Account {descendant} is already attached to the hierarchy")]
    DuplicateEdge { descendant: AccountId },

    /// The parent has no self-edge on record.
    #[error("Parent account {parent} is not attached to the hierarchy")]
    DanglingParent { parent: AccountId },

    #[error("Storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl HierarchyError {
    const fn outcome(&self) -> &'static str {
        match self {
            Self::DuplicateEdge { .. } => "duplicate_edge",
            Self::DanglingParent { .. } => "dangling_parent",
            Self::Storage(_) => "storage_error",
        }
    }
}

/// Downline size of an account, excluding the account itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub account: AccountId,
    pub total: u64,
    /// `(depth, count)` pairs, depth ascending, depth >= 1.
    pub levels: Vec<(u32, u64)>,
}

/// Edges a new account receives from its parent's ancestor chain.
///
/// Each `(G, parent, d)` becomes `(G, account, d + 1)`. The parent's own
/// self-edge produces the direct-parent edge, so no separate case exists.
#[must_use]
pub fn derive_edges(account: AccountId, parent_chain: &[HierarchyEdge]) -> Vec<HierarchyEdge> {
    let mut edges: Vec<HierarchyEdge> = parent_chain
        .iter()
        .map(|edge| HierarchyEdge::new(edge.ancestor, account, edge.depth + 1))
        .collect();
    edges.sort_by_key(|edge| edge.depth);
    edges
}

#[derive(Clone)]
pub struct HierarchyEngine {
    store: Arc<dyn EdgeStore>,
}

impl HierarchyEngine {
    #[must_use]
    pub fn new(store: Arc<dyn EdgeStore>) -> Self {
        Self { store }
    }

    /// Links `account` into the forest under `parent`, or as a root.
    ///
    /// Runs in a single store transaction: on any error no edge for
    /// `account` is persisted. Returns the written edges, self-edge first.
    pub async fn attach(
        &self,
        account: AccountId,
        parent: Option<AccountId>,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        let start = Instant::now();
        let result = self.attach_in_transaction(account, parent).await;

        let outcome = result.as_ref().map_or_else(HierarchyError::outcome, |_| "attached");
        metrics::counter!("hierarchy_attach_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(edges) => {
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("hierarchy_attach_edges").record(edges.len() as f64);
                info!(
                    event = "hierarchy_attached",
                    account = %account,
                    parent = ?parent.map(|p| p.value()),
                    edges = edges.len(),
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Account attached to hierarchy"
                );
            }
            Err(e) => {
                warn!(
                    event = "hierarchy_attach_failed",
                    account = %account,
                    parent = ?parent.map(|p| p.value()),
                    outcome,
                    error = %e,
                    "Hierarchy attach failed"
                );
            }
        }

        result
    }

    async fn attach_in_transaction(
        &self,
        account: AccountId,
        parent: Option<AccountId>,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        // An account cannot have been attached before its own attach.
        if let Some(parent) = parent
            && parent == account
        {
            return Err(HierarchyError::DanglingParent { parent });
        }

        let mut txn = self.store.begin().await?;

        match Self::write_edges(txn.as_mut(), account, parent).await {
            Ok(edges) => {
                txn.commit().await?;
                Ok(edges)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back hierarchy transaction");
                }
                Err(e)
            }
        }
    }

    async fn write_edges(
        txn: &mut dyn EdgeTransaction,
        account: AccountId,
        parent: Option<AccountId>,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        let self_edge = HierarchyEdge::self_edge(account);
        txn.insert_batch(&[self_edge]).await?;

        let mut written = vec![self_edge];

        if let Some(parent) = parent {
            let chain = txn.chain_of(parent).await?;
            if chain.is_empty() {
                return Err(HierarchyError::DanglingParent { parent });
            }

            let derived = derive_edges(account, &chain);
            debug!(account = %account, parent = %parent, count = derived.len(), "Writing derived edges");
            txn.insert_batch(&derived).await?;
            written.extend(derived);
        }

        Ok(written)
    }

    /// Ancestors of `account`, depth ascending; the account itself comes
    /// first at depth 0. Empty when the account was never attached.
    pub async fn ancestors_of(&self, account: AccountId) -> Result<Vec<Relative>, HierarchyError> {
        let edges = self.store.ancestors(account).await?;
        Ok(edges
            .into_iter()
            .map(|edge| Relative::new(edge.ancestor, edge.depth))
            .collect())
    }

    /// Descendants of `account` including itself at depth 0, optionally
    /// limited to `depth <= max_depth`.
    pub async fn descendants_of(
        &self,
        account: AccountId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Relative>, HierarchyError> {
        let edges = self.store.descendants(account, max_depth).await?;
        Ok(edges
            .into_iter()
            .map(|edge| Relative::new(edge.descendant, edge.depth))
            .collect())
    }

    /// Whether `account` has its self-edge, i.e. can act as a parent.
    pub async fn is_attached(&self, account: AccountId) -> Result<bool, HierarchyError> {
        self.store.contains(account, account).await
    }

    pub async fn team_summary(
        &self,
        account: AccountId,
        max_depth: Option<u32>,
    ) -> Result<TeamSummary, HierarchyError> {
        let downline = self.descendants_of(account, max_depth).await?;
        Ok(summarize(account, &downline))
    }
}

fn summarize(account: AccountId, downline: &[Relative]) -> TeamSummary {
    let mut levels: BTreeMap<u32, u64> = BTreeMap::new();
    for member in downline.iter().filter(|m| m.depth > 0) {
        *levels.entry(member.depth).or_default() += 1;
    }

    TeamSummary {
        account,
        total: levels.values().sum(),
        levels: levels.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn id(n: i32) -> AccountId {
        AccountId::new(n)
    }

    #[test]
    fn derive_from_root_yields_direct_parent_edge() {
        let chain = [HierarchyEdge::self_edge(id(1))];
        let derived = derive_edges(id(2), &chain);
        assert_eq!(derived, vec![HierarchyEdge::new(id(1), id(2), 1)]);
    }

    #[test]
    fn derive_extends_every_ancestor_by_one() {
        let chain = [
            HierarchyEdge::new(id(3), id(3), 0),
            HierarchyEdge::new(id(1), id(3), 2),
            HierarchyEdge::new(id(2), id(3), 1),
        ];
        let derived = derive_edges(id(4), &chain);
        assert_eq!(
            derived,
            vec![
                HierarchyEdge::new(id(3), id(4), 1),
                HierarchyEdge::new(id(2), id(4), 2),
                HierarchyEdge::new(id(1), id(4), 3),
            ]
        );
    }

    #[test]
    fn derive_never_duplicates_parent_pair() {
        let chain = [
            HierarchyEdge::self_edge(id(5)),
            HierarchyEdge::new(id(1), id(5), 1),
        ];
        let derived = derive_edges(id(6), &chain);
        let pairs: HashSet<_> = derived.iter().map(|e| (e.ancestor, e.descendant)).collect();
        assert_eq!(pairs.len(), derived.len());
        assert_eq!(
            derived.iter().filter(|e| e.ancestor == id(5)).count(),
            1,
            "parent pair must appear exactly once"
        );
    }

    #[test]
    fn summary_skips_self_and_counts_levels() {
        let downline = [
            Relative::new(id(1), 0),
            Relative::new(id(2), 1),
            Relative::new(id(3), 1),
            Relative::new(id(4), 2),
        ];
        let summary = summarize(id(1), &downline);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.levels, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn summary_of_leaf_is_empty() {
        let summary = summarize(id(9), &[Relative::new(id(9), 0)]);
        assert_eq!(summary.total, 0);
        assert!(summary.levels.is_empty());
    }
}
