//! Access/refresh token minting. Opaque to the hierarchy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Account;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Expected a {expected} token")]
    WrongType { expected: TokenType },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    /// Account id carried in `sub`.
    pub fn account_id(&self) -> Result<crate::domain::AccountId, TokenError> {
        self.sub
            .parse::<i32>()
            .map(crate::domain::AccountId::new)
            .map_err(|_| TokenError::Invalid(format!("Malformed subject '{}'", self.sub)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, account: &Account) -> Result<TokenPair, TokenError>;

    /// Decodes `token` and checks its signature, expiry and type.
    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError>;

    /// Issues a new pair from a valid refresh token.
    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;
}
