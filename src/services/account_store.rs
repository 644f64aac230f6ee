//! Domain service for account persistence.
//!
//! The registration workflow creates accounts and resolves parent referral
//! codes through this trait; it never talks to the repositories directly.

use thiserror::Error;

use crate::db::{Account, NewAccount};
use crate::domain::AccountId;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Email or referral code is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Account not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a verified account under a generated username.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Conflict`] if the email or referral code exists.
    async fn create_account(&self, account: NewAccount) -> Result<Account, AccountError>;

    async fn find_account_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<AccountId>, AccountError>;

    async fn get(&self, id: AccountId) -> Result<Account, AccountError>;

    /// Removes an account that never made it into the hierarchy.
    async fn delete_account(&self, id: AccountId) -> Result<bool, AccountError>;

    async fn email_taken(&self, email: &str) -> Result<bool, AccountError>;

    async fn referral_code_taken(&self, code: &str) -> Result<bool, AccountError>;

    /// Returns the account when `password` matches its stored hash.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, AccountError>;
}
