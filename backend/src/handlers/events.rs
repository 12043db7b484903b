use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::automation::{DomainEvent, ExecutionSummary};
use crate::error::ApiResult;

pub fn event_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(dispatch_event))
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub event: DomainEvent,
    pub results: Vec<ExecutionSummary>,
}

async fn dispatch_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<DomainEvent>,
) -> ApiResult<Json<DispatchResponse>> {
    let results = state.engine.dispatch(&event).await?;
    Ok(Json(DispatchResponse { event, results }))
}
