//! HS256 JWT implementation of the `TokenIssuer` trait.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};

use crate::config::TokenConfig;
use crate::db::Account;
use crate::services::token_issuer::{Claims, TokenError, TokenIssuer, TokenPair, TokenType};

pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.secret.as_bytes(),
            Duration::minutes(config.access_ttl_minutes),
            Duration::minutes(config.refresh_ttl_minutes),
        )
    }

    fn mint(
        &self,
        sub: &str,
        username: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            username: username.to_string(),
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(format!("Failed to encode token: {e}")))
    }

    fn pair_for(&self, sub: &str, username: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.mint(sub, username, TokenType::Access, self.access_ttl)?,
            refresh: self.mint(sub, username, TokenType::Refresh, self.refresh_ttl)?,
        })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, account: &Account) -> Result<TokenPair, TokenError> {
        self.pair_for(&account.id.to_string(), &account.username)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }

        Ok(data.claims)
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.pair_for(&claims.sub, &claims.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn account() -> Account {
        Account {
            id: AccountId::new(42),
            username: "M123456".to_string(),
            email: "a@example.com".to_string(),
            phone: "5550100".to_string(),
            referral_code: "REF42".to_string(),
            parent_id: None,
            first_name: "Ada".to_string(),
            last_name: String::new(),
            is_active: true,
            is_email_verified: true,
            created_at: crate::db::now_timestamp(),
            updated_at: crate::db::now_timestamp(),
        }
    }

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(b"test-secret", Duration::minutes(5), Duration::days(1))
    }

    #[test]
    fn issued_access_token_verifies() {
        let issuer = issuer();
        let pair = issuer.issue(&account()).unwrap();
        let claims = issuer.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "M123456");
        assert_eq!(claims.account_id().unwrap(), AccountId::new(42));
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue(&account()).unwrap();
        assert!(matches!(
            issuer.verify(&pair.refresh, TokenType::Access),
            Err(TokenError::WrongType { expected: TokenType::Access })
        ));
        assert!(issuer.refresh(&pair.access).is_err());
    }

    #[test]
    fn refresh_issues_new_pair() {
        let issuer = issuer();
        let pair = issuer.issue(&account()).unwrap();
        let rotated = issuer.refresh(&pair.refresh).unwrap();
        assert_ne!(rotated.access, pair.access);
        let claims = issuer.verify(&rotated.access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = JwtTokenIssuer::new(b"test-secret", Duration::minutes(-10), Duration::days(1));
        let pair = issuer.issue(&account()).unwrap();
        assert!(matches!(
            issuer.verify(&pair.access, TokenType::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = JwtTokenIssuer::new(b"other-secret", Duration::minutes(5), Duration::days(1));
        let pair = other.issue(&account()).unwrap();
        assert!(matches!(
            issuer().verify(&pair.access, TokenType::Access),
            Err(TokenError::Invalid(_))
        ));
        assert!(issuer().verify("not-a-jwt", TokenType::Access).is_err());
    }
}
