use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

use crate::entities::otp_verifications;

pub struct OtpRepository {
    conn: DatabaseConnection,
}

impl OtpRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, email: &str, code: &str) -> Result<i32> {
        let model = otp_verifications::ActiveModel {
            email: Set(email.to_string()),
            code: Set(code.to_string()),
            is_used: Set(false),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert OTP record")?;

        Ok(model.id)
    }

    /// Newest unused record for `email` and `code` created at or after `issued_after`.
    pub async fn find_unused(
        &self,
        email: &str,
        code: &str,
        issued_after: &str,
    ) -> Result<Option<otp_verifications::Model>> {
        otp_verifications::Entity::find()
            .filter(otp_verifications::Column::Email.eq(email))
            .filter(otp_verifications::Column::Code.eq(code))
            .filter(otp_verifications::Column::IsUsed.eq(false))
            .filter(otp_verifications::Column::CreatedAt.gte(issued_after))
            .order_by_desc(otp_verifications::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query OTP record")
    }

    /// Marks the record used. Returns false when another caller got there first.
    pub async fn consume(&self, id: i32) -> Result<bool> {
        let result = otp_verifications::Entity::update_many()
            .col_expr(otp_verifications::Column::IsUsed, Expr::value(true))
            .filter(otp_verifications::Column::Id.eq(id))
            .filter(otp_verifications::Column::IsUsed.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to consume OTP record")?;

        Ok(result.rows_affected == 1)
    }

    /// Deletes used records and records created before `issued_before`.
    pub async fn prune(&self, issued_before: &str) -> Result<u64> {
        let result = otp_verifications::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(otp_verifications::Column::IsUsed.eq(true))
                    .add(otp_verifications::Column::CreatedAt.lt(issued_before)),
            )
            .exec(&self.conn)
            .await
            .context("Failed to prune OTP records")?;

        Ok(result.rows_affected)
    }
}
