use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::hierarchy::HierarchyEngine;
use crate::services::{
    AccountStore, JwtTokenIssuer, OtpChannel, OtpDelivery, RegistrationService,
    SeaOrmAccountStore, SeaOrmOtpChannel, SeaOrmRegistrationService, Sweeper, TokenIssuer,
    TracingDelivery,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub hierarchy: HierarchyEngine,

    pub accounts: Arc<dyn AccountStore>,

    pub otp: Arc<dyn OtpChannel>,

    pub tokens: Arc<dyn TokenIssuer>,

    pub registration: Arc<dyn RegistrationService>,

    pub sweeper: Sweeper,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_delivery(config, Arc::new(TracingDelivery)).await
    }

    /// Same as [`SharedState::new`] with a custom OTP delivery sink.
    pub async fn with_delivery(
        config: Config,
        delivery: Arc<dyn OtpDelivery>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let hierarchy = HierarchyEngine::new(store.edge_store());

        let accounts =
            Arc::new(SeaOrmAccountStore::new(store.clone())) as Arc<dyn AccountStore + 'static>;

        let otp = Arc::new(SeaOrmOtpChannel::new(
            store.clone(),
            delivery,
            config.registration.otp_expiry_seconds,
        )) as Arc<dyn OtpChannel + 'static>;

        let tokens =
            Arc::new(JwtTokenIssuer::from_config(&config.tokens)) as Arc<dyn TokenIssuer + 'static>;

        let registration = Arc::new(SeaOrmRegistrationService::new(
            store.clone(),
            accounts.clone(),
            otp.clone(),
            tokens.clone(),
            hierarchy.clone(),
            config.registration.clone(),
            config.security.clone(),
        )) as Arc<dyn RegistrationService + 'static>;

        let sweeper = Sweeper::new(store.clone(), otp.clone(), config.sweeper.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            hierarchy,
            accounts,
            otp,
            tokens,
            registration,
            sweeper,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
