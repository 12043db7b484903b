use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::automation::{ExecutionStore, LeadRepository};
use crate::tests::{fixtures, helpers::TestApp};
use leadgen_shared::{ExecutionStatus, LeadStatus};

async fn create_workflow(app: &TestApp, payload: serde_json::Value) -> String {
    let (status, created) = app.post("/api/v1/workflows", payload).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_and_fetch_workflow() {
    let app = TestApp::new();
    let id = create_workflow(&app, fixtures::workflow_payload()).await;

    let (status, workflow) = app.get(&format!("/api/v1/workflows/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workflow["trigger"], "manual");
    assert_eq!(workflow["steps"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_workflow_with_bad_step_config_is_rejected() {
    let app = TestApp::new();
    let mut payload = fixtures::workflow_payload();
    payload["steps"][1]["config"] = json!({ "duration": "soon" });

    let (status, body) = app.post("/api/v1/workflows", payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_object().unwrap().contains_key("steps[1].config"));
}

#[tokio::test]
async fn test_execute_persists_history_and_lead_changes() {
    let app = TestApp::new();
    let lead = fixtures::lead();
    app.seed_lead(&lead).await;
    let id = create_workflow(&app, fixtures::workflow_payload()).await;

    let (status, execution) = app
        .post(
            &format!("/api/v1/workflows/{}/execute", id),
            json!({ "leadId": lead.id, "triggerData": { "source": "sales-desk" } }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(execution["status"], "completed");
    assert_eq!(execution["step_results"].as_array().unwrap().len(), 2);
    assert_eq!(execution["step_results"][1]["result"]["delayMinutes"], 30.0);
    assert_eq!(execution["trigger_data"]["source"], "sales-desk");

    let stored = app.store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Contacted);

    let execution_id: Uuid = execution["id"].as_str().unwrap().parse().unwrap();
    let persisted = app.store.get_execution(execution_id).await.unwrap().unwrap();
    assert_eq!(persisted.status, ExecutionStatus::Completed);

    let (status, fetched) = app.get(&format!("/api/v1/executions/{}", execution_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], execution["id"]);
}

#[tokio::test]
async fn test_execute_without_body() {
    let app = TestApp::new();
    let payload = json!({
        "name": "Ping",
        "trigger": "manual",
        "steps": [
            { "type": "integration", "name": "ping crm", "order": 1,
              "config": { "integrationId": "crm", "action": "ping" } }
        ]
    });
    let id = create_workflow(&app, payload).await;

    let (status, execution) = app.post(&format!("/api/v1/workflows/{}/execute", id), json!(null)).await;
    assert_eq!(status, StatusCode::OK, "{}", execution);
    assert_eq!(execution["status"], "completed");
    assert!(execution["lead_id"].is_null());

    let intents = app.dry_run.intents().await;
    assert_eq!(intents.integrations.len(), 1);
    assert_eq!(intents.integrations[0].action, "ping");
}

#[tokio::test]
async fn test_execute_inactive_workflow_is_rejected() {
    let app = TestApp::new();
    let mut payload = fixtures::workflow_payload();
    payload["is_active"] = json!(false);
    let id = create_workflow(&app, payload).await;

    let (status, _) = app.post(&format!("/api/v1/workflows/{}/execute", id), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preview_leaves_no_trace() {
    let app = TestApp::new();
    let workflow = fixtures::onboarding_workflow();
    let id = create_workflow(&app, serde_json::to_value(&workflow).unwrap()).await;

    let (status, preview) = app
        .post(
            &format!("/api/v1/workflows/{}/preview", id),
            json!({ "lead": { "email": "grace@saas.dev", "industry": "SaaS" } }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["execution"]["status"], "completed");
    assert_eq!(preview["execution"]["execution_context"]["extra"]["preview"], true);
    assert_eq!(preview["lead"]["score"], 55);
    assert_eq!(preview["intents"]["notifications"][0]["message"], "New SaaS lead grace@saas.dev");

    let (_, history) = app.get(&format!("/api/v1/workflows/{}/executions", id)).await;
    assert_eq!(history, json!([]));
    assert!(app.dry_run.intents().await.notifications.is_empty());
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let app = TestApp::new();
    let id = create_workflow(&app, fixtures::workflow_payload()).await;
    for _ in 0..3 {
        let (status, _) = app.post(&format!("/api/v1/workflows/{}/execute", id), json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, history) = app.get(&format!("/api/v1/workflows/{}/executions?limit=2", id)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0]["started_at"].as_str().unwrap() >= history[1]["started_at"].as_str().unwrap());
}

#[tokio::test]
async fn test_history_for_unknown_workflow_is_404() {
    let app = TestApp::new();
    let (status, _) = app.get(&format!("/api/v1/workflows/{}/executions", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/api/v1/executions/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
