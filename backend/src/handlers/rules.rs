use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use leadgen_shared::{BusinessRule, LeadRecord};

use crate::AppState;
use crate::automation::{RuleTestReport, validate_rule};
use crate::error::{ApiError, ApiResult};

pub fn rule_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_rule))
        .route("/:id", get(get_rule).put(update_rule).delete(delete_rule))
        .route("/:id/test", post(test_rule))
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    #[serde(flatten)]
    pub rule: BusinessRule,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestRuleRequest {
    #[serde(alias = "record")]
    pub lead: LeadRecord,
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(mut rule): Json<BusinessRule>,
) -> ApiResult<(StatusCode, Json<RuleResponse>)> {
    let warnings = validate_rule(&rule)?;

    rule.id = Uuid::new_v4();
    rule.created_at = Utc::now();
    rule.updated_at = None;
    state.rules.save_rule(&rule).await?;

    info!("Created rule '{}' ({})", rule.name, rule.id);
    Ok((StatusCode::CREATED, Json(RuleResponse { rule, warnings })))
}

async fn get_rule(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<BusinessRule>> {
    let rule = state
        .rules
        .get_rule(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Rule {}", id)))?;
    Ok(Json(rule))
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(mut rule): Json<BusinessRule>,
) -> ApiResult<Json<RuleResponse>> {
    let existing = state
        .rules
        .get_rule(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Rule {}", id)))?;
    let warnings = validate_rule(&rule)?;

    rule.id = id;
    rule.created_at = existing.created_at;
    rule.created_by_id = existing.created_by_id;
    rule.updated_at = Some(Utc::now());
    state.rules.save_rule(&rule).await?;

    info!("Updated rule '{}' ({})", rule.name, rule.id);
    Ok(Json(RuleResponse { rule, warnings }))
}

async fn delete_rule(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if !state.rules.delete_rule(id).await? {
        return Err(ApiError::not_found(format!("Rule {}", id)));
    }
    info!("Deleted rule {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn test_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<TestRuleRequest>,
) -> ApiResult<Json<RuleTestReport>> {
    Ok(Json(state.engine.test_rule(id, request.lead).await?))
}
