//! `SeaORM` implementation of the `OtpChannel` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, info};

use crate::constants::expiry::clamped;
use crate::constants::otp::CODE_LENGTH;
use crate::db::{Store, format_timestamp};
use crate::services::otp_channel::{IssuedOtp, OtpChannel, OtpDelivery, OtpError};

/// Delivery sink that only logs. Stands in for an email gateway.
pub struct TracingDelivery;

#[async_trait]
impl OtpDelivery for TracingDelivery {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), OtpError> {
        info!(event = "otp_delivered", email = %email, code = %code, "OTP issued");
        Ok(())
    }
}

pub struct SeaOrmOtpChannel {
    store: Store,
    delivery: Arc<dyn OtpDelivery>,
    expiry: Duration,
}

impl SeaOrmOtpChannel {
    #[must_use]
    pub fn new(store: Store, delivery: Arc<dyn OtpDelivery>, expiry_seconds: u64) -> Self {
        Self {
            store,
            delivery,
            expiry: clamped(expiry_seconds),
        }
    }

    fn oldest_valid_timestamp(&self) -> String {
        format_timestamp(Utc::now() - self.expiry)
    }
}

/// Zero-padded decimal code of [`CODE_LENGTH`] digits.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[async_trait]
impl OtpChannel for SeaOrmOtpChannel {
    async fn issue(&self, email: &str) -> Result<IssuedOtp, OtpError> {
        let code = generate_code();
        let id = self.store.create_otp(email, &code).await?;
        debug!(otp_id = id, email = %email, "Stored OTP record");

        self.delivery.deliver(email, &code).await?;
        metrics::counter!("otp_issued_total").increment(1);

        Ok(IssuedOtp {
            email: email.to_string(),
            expires_at: format_timestamp(Utc::now() + self.expiry),
        })
    }

    async fn verify(&self, email: &str, code: &str) -> Result<bool, OtpError> {
        let record = self
            .store
            .find_unused_otp(email, code, &self.oldest_valid_timestamp())
            .await?;

        let Some(record) = record else {
            metrics::counter!("otp_verify_total", "outcome" => "rejected").increment(1);
            return Ok(false);
        };

        let consumed = self.store.consume_otp(record.id).await?;
        let outcome = if consumed { "accepted" } else { "raced" };
        metrics::counter!("otp_verify_total", "outcome" => outcome).increment(1);

        Ok(consumed)
    }

    async fn prune_expired(&self) -> Result<u64, OtpError> {
        Ok(self
            .store
            .prune_otps(&self.oldest_valid_timestamp())
            .await?)
    }
}
