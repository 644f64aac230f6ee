use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The primary key (ancestor_id, descendant_id) serves descendant scans.
        // Ancestor scans go through this one.
        manager
            .create_index(
                Index::create()
                    .name("idx_hierarchy_edges_descendant_depth")
                    .table(HierarchyEdges::Table)
                    .col(HierarchyEdges::DescendantId)
                    .col(HierarchyEdges::Depth)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_otp_verifications_email")
                    .table(OtpVerifications::Table)
                    .col(OtpVerifications::Email)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_registrations_expires_at")
                    .table(PendingRegistrations::Table)
                    .col(PendingRegistrations::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_pending_registrations_expires_at")
                    .table(PendingRegistrations::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_otp_verifications_email")
                    .table(OtpVerifications::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_hierarchy_edges_descendant_depth")
                    .table(HierarchyEdges::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum HierarchyEdges {
    Table,
    DescendantId,
    Depth,
}

#[derive(DeriveIden)]
enum OtpVerifications {
    Table,
    Email,
}

#[derive(DeriveIden)]
enum PendingRegistrations {
    Table,
    ExpiresAt,
}
