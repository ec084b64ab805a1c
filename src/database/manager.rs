use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool construction and maintenance for the platform database
pub struct DatabaseManager;

impl DatabaseManager {
    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
    }

    /// Open a pool and verify it with a round trip
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let pool = Self::pool_options(config).connect(&config.url).await?;
        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Pool that connects on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        Ok(Self::pool_options(config).connect_lazy(&config.url)?)
    }

    /// Apply bundled migrations in `migrations/`
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
