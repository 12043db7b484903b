use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use leadgen_shared::{LeadRecord, Workflow, WorkflowExecution};

use crate::AppState;
use crate::automation::{WorkflowPreview, validate_workflow};
use crate::error::{ApiError, ApiResult};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 200;

pub fn workflow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_workflow))
        .route("/:id", get(get_workflow))
        .route("/:id/preview", post(preview_workflow))
        .route("/:id/execute", post(execute_workflow))
        .route("/:id/executions", get(list_executions))
}

pub fn execution_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id", get(get_execution))
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub workflow: Workflow,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default, alias = "record")]
    pub lead: Option<LeadRecord>,
    #[serde(default, alias = "triggerData")]
    pub trigger_data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default, alias = "leadId")]
    pub lead_id: Option<Uuid>,
    #[serde(default, alias = "triggerData")]
    pub trigger_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

async fn create_workflow(
    State(state): State<Arc<AppState>>,
    Json(mut workflow): Json<Workflow>,
) -> ApiResult<(StatusCode, Json<WorkflowResponse>)> {
    let warnings = validate_workflow(&workflow)?;

    workflow.id = Uuid::new_v4();
    workflow.created_at = Utc::now();
    workflow.updated_at = None;
    state.workflows.save_workflow(&workflow).await?;

    info!("Created workflow '{}' ({}) on {}", workflow.name, workflow.id, workflow.trigger.as_str());
    Ok((StatusCode::CREATED, Json(WorkflowResponse { workflow, warnings })))
}

async fn get_workflow(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<Workflow>> {
    let workflow = state
        .workflows
        .get_workflow(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Workflow {}", id)))?;
    Ok(Json(workflow))
}

async fn preview_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<PreviewRequest>>,
) -> ApiResult<Json<WorkflowPreview>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let preview = state
        .engine
        .preview_workflow(id, request.lead, request.trigger_data)
        .await?;
    Ok(Json(preview))
}

async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExecuteRequest>>,
) -> ApiResult<Json<WorkflowExecution>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let execution = state
        .engine
        .execute_workflow(id, request.lead_id, request.trigger_data)
        .await?;
    Ok(Json(execution))
}

async fn list_executions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<WorkflowExecution>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.engine.list_executions(id, limit).await?))
}

async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkflowExecution>> {
    Ok(Json(state.engine.get_execution(id).await?))
}
