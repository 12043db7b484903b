use axum::{Json, extract::State, http::StatusCode};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;
use crate::database;

pub mod events;
pub mod rules;
pub mod workflows;

pub use events::event_routes;
pub use rules::rule_routes;
pub use workflows::{execution_routes, workflow_routes};

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let storage = match &state.db_pool {
        Some(pool) if database::health_check(pool).await => "postgres",
        Some(_) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "service": "leadgen-automation", "storage": "postgres"})),
            );
        }
        None => "memory",
    };

    (
        StatusCode::OK,
        Json(json!({"status": "healthy", "service": "leadgen-automation", "storage": storage})),
    )
}
