//! Domain service for the email/OTP registration workflow and login.
//!
//! Registration is two-phase. `begin` validates the request, parks it as a
//! pending registration keyed by an opaque token and sends an OTP. `verify`
//! exchanges token, email and OTP for a durable account linked into the
//! referral hierarchy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Account;
use crate::domain::AccountId;
use crate::domain::validation::ValidationError;
use crate::hierarchy::HierarchyError;
use crate::services::account_store::AccountError;
use crate::services::otp_channel::OtpError;
use crate::services::token_issuer::{TokenError, TokenPair};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Parent referral code does not resolve to an attached account.
    #[error("Unknown parent referral code: {0}")]
    UnknownParent(String),

    #[error("Registration not found. Please register again")]
    RegistrationNotFound,

    #[error("Registration expired. Please register again")]
    RegistrationExpired,

    #[error("Email does not match the registration")]
    EmailMismatch,

    #[error("Invalid OTP or OTP expired")]
    InvalidOtp,

    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountInactive,

    #[error("Email is not verified")]
    EmailNotVerified,

    #[error("Account not found")]
    NotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RegistrationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RegistrationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ValidationError> for RegistrationError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<AccountError> for RegistrationError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::NotFound => Self::NotFound,
            AccountError::Database(msg) => Self::Database(msg),
            AccountError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<OtpError> for RegistrationError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Database(msg) => Self::Database(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    #[serde(default)]
    pub parent_referral_code: Option<String>,
    pub password: String,
}

/// Handle returned by `begin`; the client echoes `token` to `verify`.
#[derive(Debug, Clone, Serialize)]
pub struct PendingTicket {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    pub email: String,
    pub otp: String,
}

/// Public account view. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub first_name: String,
    pub last_name: String,
    pub parent_id: Option<AccountId>,
    pub is_email_verified: bool,
    pub created_at: String,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            phone: account.phone,
            referral_code: account.referral_code,
            first_name: account.first_name,
            last_name: account.last_name,
            parent_id: account.parent_id,
            is_email_verified: account.is_email_verified,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub account: AccountView,
    pub tokens: TokenPair,
}

#[async_trait::async_trait]
pub trait RegistrationService: Send + Sync {
    /// Validates and parks a registration, then sends an OTP to its email.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Validation`] for malformed input,
    /// [`RegistrationError::Conflict`] for a taken email or referral code and
    /// [`RegistrationError::UnknownParent`] under the strict parent policy.
    async fn begin(&self, request: RegistrationRequest) -> Result<PendingTicket, RegistrationError>;

    /// Completes a registration. On success the account exists and is
    /// attached to the hierarchy exactly once.
    async fn verify(&self, request: VerifyRequest) -> Result<AuthSession, RegistrationError>;

    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, RegistrationError>;

    /// Rotates a refresh token for a still-active account.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RegistrationError>;

    async fn profile(&self, account: AccountId) -> Result<AccountView, RegistrationError>;
}
