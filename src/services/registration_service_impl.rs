//! `SeaORM` implementation of the `RegistrationService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::config::{RegistrationConfig, SecurityConfig};
use crate::constants::expiry::clamped;
use crate::db::repositories::account::generate_token;
use crate::db::{NewAccount, PendingRegistration, Store, format_timestamp, now_timestamp};
use crate::domain::validation::{
    normalize_email, split_name, validate_otp_code, validate_password, validate_phone,
    validate_referral_code,
};
use crate::domain::{AccountId, ParentPolicy};
use crate::hierarchy::{HierarchyEngine, HierarchyError};
use crate::services::account_store::AccountStore;
use crate::services::otp_channel::OtpChannel;
use crate::services::registration_service::{
    AccountView, AuthSession, PendingTicket, RegistrationError, RegistrationRequest,
    RegistrationService, VerifyRequest,
};
use crate::services::token_issuer::{TokenIssuer, TokenPair, TokenType};

pub struct SeaOrmRegistrationService {
    store: Store,
    accounts: Arc<dyn AccountStore>,
    otp: Arc<dyn OtpChannel>,
    tokens: Arc<dyn TokenIssuer>,
    engine: HierarchyEngine,
    config: RegistrationConfig,
    security: SecurityConfig,
}

impl SeaOrmRegistrationService {
    #[must_use]
    pub fn new(
        store: Store,
        accounts: Arc<dyn AccountStore>,
        otp: Arc<dyn OtpChannel>,
        tokens: Arc<dyn TokenIssuer>,
        engine: HierarchyEngine,
        config: RegistrationConfig,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            accounts,
            otp,
            tokens,
            engine,
            config,
            security,
        }
    }

    /// Maps a parent referral code to an attached account under the
    /// configured policy.
    async fn resolve_parent(
        &self,
        code: Option<&str>,
    ) -> Result<Option<AccountId>, RegistrationError> {
        let Some(code) = code else {
            return Ok(None);
        };

        let parent = self.accounts.find_account_by_referral_code(code).await?;
        let attached = match parent {
            Some(id) => self.engine.is_attached(id).await?.then_some(id),
            None => None,
        };

        match (attached, self.config.parent_policy) {
            (Some(id), _) => Ok(Some(id)),
            (None, ParentPolicy::Strict) => Err(RegistrationError::UnknownParent(code.to_string())),
            (None, ParentPolicy::Lenient) => {
                warn!(
                    event = "parent_ignored",
                    parent_referral_code = %code,
                    "Parent referral code did not resolve; registering without a parent"
                );
                Ok(None)
            }
        }
    }

    /// Deletes an account whose attach failed so no account exists without
    /// its self-edge. The pending registration is left for a fresh attempt.
    async fn discard_unlinked(&self, account: AccountId, cause: &HierarchyError) {
        error!(
            event = "registration_attach_failed",
            account = %account,
            error = %cause,
            "Attach failed; discarding the new account"
        );
        metrics::counter!("registration_attach_failed_total").increment(1);

        if let Err(e) = self.accounts.delete_account(account).await {
            error!(
                event = "registration_discard_failed",
                account = %account,
                error = %e,
                "Failed to delete account left outside the hierarchy"
            );
        }
    }

    fn pending_expiry(&self) -> Duration {
        clamped(self.config.pending_expiry_seconds)
    }
}

/// Blank parent codes count as absent.
fn normalize_parent_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl RegistrationService for SeaOrmRegistrationService {
    async fn begin(&self, request: RegistrationRequest) -> Result<PendingTicket, RegistrationError> {
        split_name(&request.name)?;
        let email = normalize_email(&request.email)?;
        let phone = validate_phone(&request.phone)?.to_string();
        let referral_code = validate_referral_code(&request.referral_code)?.to_string();
        validate_password(&request.password, self.security.min_password_length)?;
        let parent_code = normalize_parent_code(request.parent_referral_code.as_deref());

        if self.accounts.email_taken(&email).await? {
            return Err(RegistrationError::Conflict(format!(
                "Email '{email}' is already registered"
            )));
        }

        if self.accounts.referral_code_taken(&referral_code).await? {
            return Err(RegistrationError::Conflict(format!(
                "Referral code '{referral_code}' is already taken"
            )));
        }

        self.resolve_parent(parent_code.as_deref()).await?;

        let password_hash = self
            .store
            .hash_password(&request.password, &self.security)
            .await?;

        let now = Utc::now();
        let pending = PendingRegistration {
            token: generate_token(),
            name: request.name.trim().to_string(),
            email: email.clone(),
            phone,
            referral_code,
            parent_referral_code: parent_code,
            password_hash,
            created_at: format_timestamp(now),
            expires_at: format_timestamp(now + self.pending_expiry()),
        };
        let ticket = PendingTicket {
            token: pending.token.clone(),
            email: email.clone(),
            expires_at: pending.expires_at.clone(),
        };

        self.store.insert_pending_registration(pending).await?;
        self.otp.issue(&email).await?;

        info!(event = "registration_started", email = %email, "Registration pending OTP verification");
        metrics::counter!("registration_started_total").increment(1);

        Ok(ticket)
    }

    async fn verify(&self, request: VerifyRequest) -> Result<AuthSession, RegistrationError> {
        let email = normalize_email(&request.email)?;
        let code = validate_otp_code(&request.otp)?;

        let pending = self
            .store
            .get_pending_registration(&request.token)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound)?;

        if pending.expires_at < now_timestamp() {
            self.store.delete_pending_registration(&pending.token).await?;
            return Err(RegistrationError::RegistrationExpired);
        }

        if pending.email != email {
            return Err(RegistrationError::EmailMismatch);
        }

        let parent = self
            .resolve_parent(pending.parent_referral_code.as_deref())
            .await?;

        if !self.otp.verify(&email, code).await? {
            return Err(RegistrationError::InvalidOtp);
        }

        let (first_name, last_name) = split_name(&pending.name)?;
        let account = self
            .accounts
            .create_account(NewAccount {
                email: pending.email.clone(),
                phone: pending.phone.clone(),
                referral_code: pending.referral_code.clone(),
                password_hash: pending.password_hash.clone(),
                first_name,
                last_name,
                parent_id: parent,
            })
            .await?;

        if let Err(e) = self.engine.attach(account.id, parent).await {
            self.discard_unlinked(account.id, &e).await;
            return Err(e.into());
        }

        self.store.delete_pending_registration(&pending.token).await?;

        let tokens = self.tokens.issue(&account)?;

        info!(
            event = "registration_completed",
            account = %account.id,
            username = %account.username,
            parent = ?parent.map(|p| p.value()),
            "Account registered"
        );
        metrics::counter!("registration_completed_total").increment(1);

        Ok(AuthSession {
            account: AccountView::from(account),
            tokens,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthSession, RegistrationError> {
        let account = self
            .accounts
            .verify_credentials(username, password)
            .await?
            .ok_or(RegistrationError::InvalidCredentials)?;

        if !account.is_active {
            return Err(RegistrationError::AccountInactive);
        }

        if !account.is_email_verified {
            return Err(RegistrationError::EmailNotVerified);
        }

        let tokens = self.tokens.issue(&account)?;
        info!(event = "login", account = %account.id, "Account logged in");

        Ok(AuthSession {
            account: AccountView::from(account),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RegistrationError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;
        let account = self.accounts.get(claims.account_id()?).await?;

        if !account.is_active {
            return Err(RegistrationError::AccountInactive);
        }

        Ok(self.tokens.refresh(refresh_token)?)
    }

    async fn profile(&self, account: AccountId) -> Result<AccountView, RegistrationError> {
        Ok(AccountView::from(self.accounts.get(account).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_parent_codes_are_absent() {
        assert_eq!(normalize_parent_code(None), None);
        assert_eq!(normalize_parent_code(Some("   ")), None);
        assert_eq!(
            normalize_parent_code(Some(" ROOT1 ")),
            Some("ROOT1".to_string())
        );
    }
}
