use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::automation::RuleRepository;
use crate::tests::{fixtures, helpers::TestApp};

#[tokio::test]
async fn test_create_and_fetch_rule() {
    let app = TestApp::new();

    let (status, created) = app.post("/api/v1/rules", fixtures::rule_payload()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Fintech priority");
    assert!(created.get("warnings").is_none());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/api/v1/rules/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["priority"], 70);
    assert_eq!(fetched["conditions"][0]["operator"], "equals");
}

#[tokio::test]
async fn test_catch_all_rule_is_created_with_warning() {
    let app = TestApp::new();
    let mut payload = fixtures::rule_payload();
    payload["conditions"] = json!([]);

    let (status, created) = app.post("/api/v1/rules", payload).await;
    assert_eq!(status, StatusCode::CREATED);
    let warnings = created["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap().starts_with("Catch-all")));
}

#[tokio::test]
async fn test_invalid_rule_is_rejected_with_field_details() {
    let app = TestApp::new();
    let payload = json!({
        "name": "",
        "type": "scoring",
        "priority": 500,
        "conditions": [{ "field": "score", "operator": "roughly", "value": 3 }],
        "actions": []
    });

    let (status, body) = app.post("/api/v1/rules", payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("name"));
    assert!(details.contains_key("priority"));
    assert!(details.contains_key("conditions[0].operator"));
}

#[tokio::test]
async fn test_update_keeps_identity() {
    let app = TestApp::new();
    let (_, created) = app.post("/api/v1/rules", fixtures::rule_payload()).await;
    let id = created["id"].as_str().unwrap().to_string();

    let mut payload = fixtures::rule_payload();
    payload["priority"] = json!(20);
    let (status, updated) = app
        .send(Method::PUT, &format!("/api/v1/rules/{}", id), Some(payload))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(!updated["updated_at"].is_null());

    let stored = app.store.get_rule(id.parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.priority, 20);
}

#[tokio::test]
async fn test_delete_rule() {
    let app = TestApp::new();
    let (_, created) = app.post("/api/v1/rules", fixtures::rule_payload()).await;
    let uri = format!("/api/v1/rules/{}", created["id"].as_str().unwrap());

    let (status, _) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_rule_is_404() {
    let app = TestApp::new();
    let (status, body) = app.get(&format!("/api/v1/rules/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rule_test_endpoint_is_a_dry_run() {
    let app = TestApp::new();
    let mut payload = fixtures::rule_payload();
    payload["actions"] = json!([
        { "type": "scoring", "target": "score", "value": 75 },
        { "type": "notification", "target": "", "value": "Fintech lead {{email}}",
          "metadata": { "recipients": ["sales@acme.io"] } }
    ]);
    let (_, created) = app.post("/api/v1/rules", payload).await;
    let id = created["id"].as_str().unwrap();

    let lead = json!({ "email": "ada@bank.io", "industry": "Fintech", "score": 10 });
    let (status, report) = app
        .post(&format!("/api/v1/rules/{}/test", id), json!({ "lead": lead }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["match"]["matched"], true);
    assert_eq!(report["lead"]["score"], 75);
    assert_eq!(report["intents"]["notifications"][0]["message"], "Fintech lead ada@bank.io");

    // nothing left the process
    assert!(app.dry_run.intents().await.notifications.is_empty());
}

#[tokio::test]
async fn test_rule_test_reports_non_match() {
    let app = TestApp::new();
    let (_, created) = app.post("/api/v1/rules", fixtures::rule_payload()).await;
    let id = created["id"].as_str().unwrap();

    let (status, report) = app
        .post(
            &format!("/api/v1/rules/{}/test", id),
            json!({ "record": { "industry": "Retail", "score": 10 } }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["match"]["matched"], false);
    assert_eq!(report["actions"], json!([]));
    assert_eq!(report["lead"]["score"], 10);
}
