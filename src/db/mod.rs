use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::AccountId;
use crate::hierarchy::EdgeStore;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{Account, NewAccount};
pub use repositories::pending::PendingRegistration;

/// Fixed-width UTC timestamp. Stored timestamps compare correctly as strings.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Whether `err` was caused by a UNIQUE or PRIMARY KEY violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>().is_some_and(|db_err| {
        matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    })
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn otp_repo(&self) -> repositories::otp::OtpRepository {
        repositories::otp::OtpRepository::new(self.conn.clone())
    }

    fn pending_repo(&self) -> repositories::pending::PendingRegistrationRepository {
        repositories::pending::PendingRegistrationRepository::new(self.conn.clone())
    }

    /// Closure-table store handed to the hierarchy engine.
    #[must_use]
    pub fn edge_store(&self) -> Arc<dyn EdgeStore> {
        Arc::new(repositories::hierarchy::HierarchyRepository::new(
            self.conn.clone(),
        ))
    }

    // ========== Account Repository Methods ==========

    pub async fn create_account(&self, account: NewAccount) -> Result<Account> {
        self.account_repo().create(account).await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_email(email).await
    }

    pub async fn get_account_by_referral_code(&self, code: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_referral_code(code).await
    }

    pub async fn delete_account(&self, id: AccountId) -> Result<bool> {
        self.account_repo().delete(id).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.account_repo().email_exists(email).await
    }

    pub async fn referral_code_exists(&self, code: &str) -> Result<bool> {
        self.account_repo().referral_code_exists(code).await
    }

    pub async fn verify_account_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>> {
        self.account_repo()
            .verify_password(username, password)
            .await
    }

    /// Hashes off the async runtime.
    pub async fn hash_password(&self, password: &str, config: &SecurityConfig) -> Result<String> {
        let password = password.to_string();
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            repositories::account::hash_password(&password, Some(&config))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task panicked: {e}"))?
    }

    // ========== OTP Repository Methods ==========

    pub async fn create_otp(&self, email: &str, code: &str) -> Result<i32> {
        self.otp_repo().create(email, code).await
    }

    pub async fn find_unused_otp(
        &self,
        email: &str,
        code: &str,
        issued_after: &str,
    ) -> Result<Option<crate::entities::otp_verifications::Model>> {
        self.otp_repo().find_unused(email, code, issued_after).await
    }

    pub async fn consume_otp(&self, id: i32) -> Result<bool> {
        self.otp_repo().consume(id).await
    }

    pub async fn prune_otps(&self, issued_before: &str) -> Result<u64> {
        self.otp_repo().prune(issued_before).await
    }

    // ========== Pending Registration Methods ==========

    pub async fn insert_pending_registration(&self, pending: PendingRegistration) -> Result<()> {
        self.pending_repo().insert(pending).await
    }

    pub async fn get_pending_registration(
        &self,
        token: &str,
    ) -> Result<Option<PendingRegistration>> {
        self.pending_repo().get(token).await
    }

    pub async fn delete_pending_registration(&self, token: &str) -> Result<bool> {
        self.pending_repo().delete(token).await
    }

    pub async fn prune_pending_registrations(&self, now: &str) -> Result<u64> {
        self.pending_repo().prune(now).await
    }
}
