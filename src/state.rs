use crate::auth::password::CredentialHasher;
use crate::auth::service::AuthService;
use crate::auth::store::{PgUserStore, UserStore};
use crate::config::AppConfig;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Self::from_parts(db, config)
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(&config.auth)?;
        let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let auth = Arc::new(AuthService::new(store, hasher, config.auth.password_min_len)?);

        Ok(Self { db, config, auth })
    }
}
