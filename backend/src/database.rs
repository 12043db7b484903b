use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Create the database if it is missing, then open a pool sized by `DB_*`.
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    if !Postgres::database_exists(&config.url).await? {
        Postgres::create_database(&config.url).await?;
        info!("Database created");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    info!(
        "Automation store pool ready: {} to {} connections",
        config.min_connections, config.max_connections
    );
    Ok(pool)
}

/// Apply `backend/migrations` (rules, workflows, leads, execution history).
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Automation schema is up to date");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await.is_ok()
}
