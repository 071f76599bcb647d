//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{auth::TokenService, config::Config, db, services::mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: PgPool,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Connect to the database, run pending migrations, and build the
    /// collaborators handlers need.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database).await?;
        db::run_migrations(&pool).await?;

        let tokens = TokenService::new(&config.auth);
        let mailer = crate::services::mail::from_config(&config.mail)?;

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            tokens,
            mailer,
        })
    }
}
