//! `SeaORM` implementation of the `AccountStore` trait.

use async_trait::async_trait;

use crate::db::{Account, NewAccount, Store, is_unique_violation};
use crate::domain::AccountId;
use crate::services::account_store::{AccountError, AccountStore};

pub struct SeaOrmAccountStore {
    store: Store,
}

impl SeaOrmAccountStore {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccountStore for SeaOrmAccountStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, AccountError> {
        let email = account.email.clone();
        let referral_code = account.referral_code.clone();

        match self.store.create_account(account).await {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(AccountError::Conflict(format!(
                "Email '{email}' or referral code '{referral_code}' is already registered"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_account_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<AccountId>, AccountError> {
        let account = self.store.get_account_by_referral_code(code).await?;
        Ok(account.map(|a| a.id))
    }

    async fn get(&self, id: AccountId) -> Result<Account, AccountError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, AccountError> {
        Ok(self.store.delete_account(id).await?)
    }

    async fn email_taken(&self, email: &str) -> Result<bool, AccountError> {
        Ok(self.store.email_exists(email).await?)
    }

    async fn referral_code_taken(&self, code: &str) -> Result<bool, AccountError> {
        Ok(self.store.referral_code_exists(code).await?)
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, AccountError> {
        Ok(self
            .store
            .verify_account_password(username, password)
            .await?)
    }
}
