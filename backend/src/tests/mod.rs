pub mod helpers;
pub mod integration;
pub mod unit;

// Common test utilities and shared test setup
use sqlx::PgPool;
use std::sync::Once;

static INIT: Once = Once::new();

/// Route tracing output through the test harness once per binary.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init()
            .ok();
    });
}

pub struct TestContext {
    pub db_pool: PgPool,
}

impl TestContext {
    /// Connect to `TEST_DATABASE_URL` and migrate. Returns `None` when the
    /// variable is unset so Postgres tests are skipped on machines without one.
    pub async fn from_env() -> Option<Self> {
        let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self { db_pool: pool })
    }

    pub async fn cleanup(&self) {
        let tables = ["workflow_executions", "workflows", "business_rules", "leads"];

        for table in tables {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.db_pool)
                .await
                .ok();
        }
    }
}
