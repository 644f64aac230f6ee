use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::pending_registrations;

/// Registration data waiting for OTP confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    pub token: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub parent_referral_code: Option<String>,
    pub password_hash: String,
    pub created_at: String,
    pub expires_at: String,
}

impl From<pending_registrations::Model> for PendingRegistration {
    fn from(model: pending_registrations::Model) -> Self {
        Self {
            token: model.token,
            name: model.name,
            email: model.email,
            phone: model.phone,
            referral_code: model.referral_code,
            parent_referral_code: model.parent_referral_code,
            password_hash: model.password_hash,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }
}

pub struct PendingRegistrationRepository {
    conn: DatabaseConnection,
}

impl PendingRegistrationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, pending: PendingRegistration) -> Result<()> {
        pending_registrations::ActiveModel {
            token: Set(pending.token),
            name: Set(pending.name),
            email: Set(pending.email),
            phone: Set(pending.phone),
            referral_code: Set(pending.referral_code),
            parent_referral_code: Set(pending.parent_referral_code),
            password_hash: Set(pending.password_hash),
            created_at: Set(pending.created_at),
            expires_at: Set(pending.expires_at),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert pending registration")?;

        Ok(())
    }

    pub async fn get(&self, token: &str) -> Result<Option<PendingRegistration>> {
        let pending = pending_registrations::Entity::find_by_id(token.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query pending registration")?;

        Ok(pending.map(PendingRegistration::from))
    }

    pub async fn delete(&self, token: &str) -> Result<bool> {
        let result = pending_registrations::Entity::delete_by_id(token.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete pending registration")?;

        Ok(result.rows_affected > 0)
    }

    /// Removes every record that expired before `now`.
    pub async fn prune(&self, now: &str) -> Result<u64> {
        let result = pending_registrations::Entity::delete_many()
            .filter(pending_registrations::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to prune pending registrations")?;

        Ok(result.rows_affected)
    }
}
