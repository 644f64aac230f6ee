use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::constants::accounts::{USERNAME_DIGITS, USERNAME_PREFIX};
use crate::domain::AccountId;
use crate::entities::accounts;

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub parent_id: Option<AccountId>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from(model.id),
            username: model.username,
            email: model.email,
            phone: model.phone,
            referral_code: model.referral_code,
            parent_id: model.parent_id.map(AccountId::from),
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            is_email_verified: model.is_email_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields required to insert an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub parent_id: Option<AccountId>,
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a verified, active account under a freshly generated username.
    pub async fn create(&self, account: NewAccount) -> Result<Account> {
        let username = self.generate_unique_username().await?;
        let now = crate::db::now_timestamp();

        let model = accounts::ActiveModel {
            username: Set(username),
            email: Set(account.email),
            phone: Set(account.phone),
            referral_code: Set(account.referral_code),
            parent_id: Set(account.parent_id.map(|p| p.value())),
            first_name: Set(account.first_name),
            last_name: Set(account.last_name),
            password_hash: Set(account.password_hash),
            is_active: Set(true),
            is_email_verified: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert account")?;

        Ok(Account::from(model))
    }

    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query account by email")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_by_referral_code(&self, code: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::ReferralCode.eq(code))
            .one(&self.conn)
            .await
            .context("Failed to query account by referral code")?;

        Ok(account.map(Account::from))
    }

    /// Removes an account row. Its hierarchy edges go with it.
    pub async fn delete(&self, id: AccountId) -> Result<bool> {
        let result = accounts::Entity::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete account")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count accounts by email")?;

        Ok(count > 0)
    }

    pub async fn referral_code_exists(&self, code: &str) -> Result<bool> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::ReferralCode.eq(code))
            .count(&self.conn)
            .await
            .context("Failed to count accounts by referral code")?;

        Ok(count > 0)
    }

    /// Verify a password and return the account on success.
    /// Argon2 verification runs on the blocking pool.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account for password verification")?;

        let Some(account) = account else {
            return Ok(None);
        };

        let password_hash = account.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid.then(|| Account::from(account)))
    }

    async fn generate_unique_username(&self) -> Result<String> {
        loop {
            let candidate = generate_username();
            let taken = accounts::Entity::find()
                .filter(accounts::Column::Username.eq(candidate.as_str()))
                .count(&self.conn)
                .await
                .context("Failed to check username availability")?;

            if taken == 0 {
                return Ok(candidate);
            }
        }
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Failed to encode password salt: {e}"))?;

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// `M` followed by six random digits.
#[must_use]
pub fn generate_username() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let mut username = String::with_capacity(USERNAME_PREFIX.len() + USERNAME_DIGITS);
    username.push_str(USERNAME_PREFIX);
    for _ in 0..USERNAME_DIGITS {
        username.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    username
}

/// Generate a random opaque token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
