use axum::{Router, http::Method, routing::get};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod automation;
mod config;
mod database;
mod error;
mod handlers;
mod jobs;
mod persistence;
mod services;

pub use error::{ApiError, ApiResult, AppError};

use automation::{
    AutomationEngine, EngineOptions, ExecutionStore, LeadRepository, RuleRepository, SideEffects,
    WorkflowRepository,
};
use config::{Config, StorageBackend};
use persistence::{MemoryStore, PgStore};
use services::{ChannelEnrichmentQueue, EmailNotificationSender, HttpIntegrationInvoker, LogNotificationSender};

#[cfg(test)]
mod tests;

pub struct AppState {
    pub engine: AutomationEngine,
    pub rules: Arc<dyn RuleRepository>,
    pub workflows: Arc<dyn WorkflowRepository>,
    /// Present when running against Postgres
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, effects: SideEffects, options: EngineOptions, db_pool: Option<PgPool>) -> Self
    where
        S: RuleRepository + WorkflowRepository + LeadRepository + ExecutionStore + 'static,
    {
        Self {
            engine: AutomationEngine::with_store(store.clone(), effects, options),
            rules: store.clone(),
            workflows: store,
            db_pool,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Lead Automation API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/rules", handlers::rule_routes())
        .nest("/api/v1/workflows", handlers::workflow_routes())
        .nest("/api/v1/executions", handlers::execution_routes())
        .nest("/api/v1/events", handlers::event_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let integrations = Arc::new(HttpIntegrationInvoker::new(&config.integrations)?);
    let (enrichment, _enrichment_worker) =
        ChannelEnrichmentQueue::spawn(integrations.clone(), config.integrations.enrichment_integration_id.clone());
    let notifier: Arc<dyn automation::NotificationSender> = if config.smtp.is_configured() {
        Arc::new(EmailNotificationSender::new(&config.smtp))
    } else {
        tracing::warn!("SMTP not configured, notifications will only be logged");
        Arc::new(LogNotificationSender)
    };
    let effects = SideEffects::new(notifier, integrations, Arc::new(enrichment));
    let options = config.automation.engine_options();

    let (app_state, executions): (AppState, Arc<dyn ExecutionStore>) = match config.storage {
        StorageBackend::Postgres => {
            let db_pool = database::create_pool(&config.database).await?;
            database::migrate(&db_pool).await?;
            let store = Arc::new(PgStore::new(db_pool.clone()));
            (AppState::new(store.clone(), effects, options, Some(db_pool)), store as Arc<dyn ExecutionStore>)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, nothing will survive a restart");
            let store = Arc::new(MemoryStore::new());
            (AppState::new(store.clone(), effects, options, None), store as Arc<dyn ExecutionStore>)
        }
    };

    let mut scheduler = jobs::JobScheduler::new(executions, config.automation.job_config()).await?;
    scheduler.start().await?;

    let app = build_router(Arc::new(app_state));

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}
