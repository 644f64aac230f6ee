//! One-time codes used to prove ownership of an email address.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for OtpError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OtpError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Issued code metadata. The code itself only leaves through [`OtpDelivery`].
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub email: String,
    pub expires_at: String,
}

/// Sink that hands a freshly issued code to the user.
#[async_trait::async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), OtpError>;
}

#[async_trait::async_trait]
pub trait OtpChannel: Send + Sync {
    /// Generates, persists and delivers a six-digit code for `email`.
    async fn issue(&self, email: &str) -> Result<IssuedOtp, OtpError>;

    /// True only for an unused, unexpired code, which is consumed in the
    /// same call. A second verify with the same code returns false.
    async fn verify(&self, email: &str, code: &str) -> Result<bool, OtpError>;

    /// Deletes used and expired records.
    async fn prune_expired(&self) -> Result<u64, OtpError>;
}
