use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::automation::{LeadRepository, RuleRepository, WorkflowRepository};
use crate::tests::{fixtures, helpers::TestApp};
use leadgen_shared::{LeadStatus, Workflow};

#[tokio::test]
async fn test_lead_created_runs_rules_then_workflows_by_priority() {
    let app = TestApp::new();
    let team = Uuid::new_v4();
    let lead = fixtures::lead_with_score(92);
    app.seed_lead(&lead).await;
    app.store.save_rule(&fixtures::hot_lead_rule(team)).await.unwrap();
    app.store.save_workflow(&fixtures::onboarding_workflow()).await.unwrap();

    let (status, body) = app
        .post("/api/v1/events", json!({ "event": "lead_created", "leadId": lead.id }))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["kind"], "rule");
    assert_eq!(results[0]["matched"], true);
    assert_eq!(results[1]["kind"], "workflow");
    assert_eq!(results[1]["status"], "completed");

    let stored = app.store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Qualified);
    assert_eq!(stored.assigned_team, Some(team));
    // the workflow's scoring step ran after the rule
    assert_eq!(stored.score, 55);

    let intents = app.dry_run.intents().await;
    assert_eq!(intents.notifications.len(), 1);
    assert_eq!(intents.notifications[0].recipients, vec!["sales@acme.io".to_string()]);
}

#[tokio::test]
async fn test_gate_stops_workflow_without_failing() {
    let app = TestApp::new();
    let mut lead = fixtures::lead();
    lead.industry = Some("Retail".to_string());
    app.seed_lead(&lead).await;
    app.store.save_workflow(&fixtures::onboarding_workflow()).await.unwrap();

    let (_, body) = app
        .post("/api/v1/events", json!({ "event": "lead_created", "leadId": lead.id }))
        .await;

    let summary = &body["results"][0];
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["gate_stopped"], true);
    assert!(app.dry_run.intents().await.notifications.is_empty());
}

#[tokio::test]
async fn test_workflows_bound_to_other_triggers_are_ignored() {
    let app = TestApp::new();
    let lead = fixtures::lead();
    app.seed_lead(&lead).await;
    let scored = Workflow {
        trigger: leadgen_shared::WorkflowTrigger::LeadScored,
        ..fixtures::onboarding_workflow()
    };
    app.store.save_workflow(&scored).await.unwrap();

    let (status, body) = app
        .post("/api/v1/events", json!({ "event": "lead_created", "leadId": lead.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_event_for_unknown_lead_is_404() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/v1/events", json!({ "event": "lead_updated", "leadId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_event_kind_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .post("/api/v1/events", json!({ "event": "lead_exploded", "leadId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
