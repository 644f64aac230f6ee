use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::domain::{AccountId, HierarchyEdge};
use crate::entities::hierarchy_edges;
use crate::hierarchy::{EdgeStore, EdgeTransaction, HierarchyError};

pub struct HierarchyRepository {
    conn: DatabaseConnection,
}

impl HierarchyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EdgeStore for HierarchyRepository {
    async fn begin(&self) -> Result<Box<dyn EdgeTransaction>, HierarchyError> {
        let txn = self.conn.begin().await?;
        Ok(Box::new(SeaOrmEdgeTransaction { txn }))
    }

    async fn ancestors(&self, descendant: AccountId) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        let rows = hierarchy_edges::Entity::find()
            .filter(hierarchy_edges::Column::DescendantId.eq(descendant.value()))
            .order_by_asc(hierarchy_edges::Column::Depth)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(edge_from_model).collect()
    }

    async fn descendants(
        &self,
        ancestor: AccountId,
        max_depth: Option<u32>,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        let mut query = hierarchy_edges::Entity::find()
            .filter(hierarchy_edges::Column::AncestorId.eq(ancestor.value()));

        if let Some(max_depth) = max_depth {
            // Depths beyond i32 cannot be stored, so an oversized limit means no limit.
            if let Ok(max_depth) = i32::try_from(max_depth) {
                query = query.filter(hierarchy_edges::Column::Depth.lte(max_depth));
            }
        }

        let rows = query
            .order_by_asc(hierarchy_edges::Column::Depth)
            .order_by_asc(hierarchy_edges::Column::DescendantId)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(edge_from_model).collect()
    }

    async fn contains(
        &self,
        ancestor: AccountId,
        descendant: AccountId,
    ) -> Result<bool, HierarchyError> {
        let count = hierarchy_edges::Entity::find()
            .filter(hierarchy_edges::Column::AncestorId.eq(ancestor.value()))
            .filter(hierarchy_edges::Column::DescendantId.eq(descendant.value()))
            .count(&self.conn)
            .await?;

        Ok(count > 0)
    }
}

pub struct SeaOrmEdgeTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl EdgeTransaction for SeaOrmEdgeTransaction {
    async fn chain_of(
        &mut self,
        descendant: AccountId,
    ) -> Result<Vec<HierarchyEdge>, HierarchyError> {
        let rows = hierarchy_edges::Entity::find()
            .filter(hierarchy_edges::Column::DescendantId.eq(descendant.value()))
            .order_by_asc(hierarchy_edges::Column::Depth)
            .all(&self.txn)
            .await?;

        rows.into_iter().map(edge_from_model).collect()
    }

    async fn insert_batch(&mut self, edges: &[HierarchyEdge]) -> Result<u64, HierarchyError> {
        let Some(first) = edges.first() else {
            return Ok(0);
        };
        let descendant = first.descendant;

        let models = edges
            .iter()
            .map(active_model_from_edge)
            .collect::<Result<Vec<_>, _>>()?;

        hierarchy_edges::Entity::insert_many(models)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| classify_insert_error(e, descendant))
    }

    async fn commit(self: Box<Self>) -> Result<(), HierarchyError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), HierarchyError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

fn classify_insert_error(err: DbErr, descendant: AccountId) -> HierarchyError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => HierarchyError::DuplicateEdge { descendant },
        _ => HierarchyError::Storage(err),
    }
}

fn edge_from_model(model: hierarchy_edges::Model) -> Result<HierarchyEdge, HierarchyError> {
    let depth = u32::try_from(model.depth).map_err(|_| {
        DbErr::Custom(format!(
            "Negative depth {} on edge {} -> {}",
            model.depth, model.ancestor_id, model.descendant_id
        ))
    })?;

    Ok(HierarchyEdge::new(
        AccountId::from(model.ancestor_id),
        AccountId::from(model.descendant_id),
        depth,
    ))
}

fn active_model_from_edge(
    edge: &HierarchyEdge,
) -> Result<hierarchy_edges::ActiveModel, HierarchyError> {
    let depth = i32::try_from(edge.depth)
        .map_err(|_| DbErr::Custom(format!("Depth {} exceeds storable range", edge.depth)))?;

    Ok(hierarchy_edges::ActiveModel {
        ancestor_id: Set(edge.ancestor.value()),
        descendant_id: Set(edge.descendant.value()),
        depth: Set(depth),
    })
}
