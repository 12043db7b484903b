// Run with TEST_DATABASE_URL set; skipped otherwise.

use chrono::{Duration, Utc};
use serial_test::serial;

use crate::automation::{ExecutionStore, LeadRepository, RuleFilter, RuleRepository, WorkflowRepository};
use crate::persistence::PgStore;
use crate::tests::{TestContext, fixtures};
use leadgen_shared::{
    ExecutionStatus, LeadPatch, LeadStatus, RuleType, Workflow, WorkflowExecution, WorkflowTrigger,
};

async fn store() -> Option<(TestContext, PgStore)> {
    let ctx = TestContext::from_env().await?;
    ctx.cleanup().await;
    let store = PgStore::new(ctx.db_pool.clone());
    Some((ctx, store))
}

#[tokio::test]
#[serial]
async fn test_lead_patch_round_trip() {
    let Some((ctx, store)) = store().await else { return };
    let lead = fixtures::lead();
    store.save_lead(&lead).await.unwrap();

    let patched = store
        .apply_patch(
            lead.id,
            &LeadPatch {
                score: Some(88),
                status: Some(LeadStatus::Qualified),
                ..LeadPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(patched.score, 88);
    assert_eq!(patched.status, LeadStatus::Qualified);
    assert_eq!(patched.email, lead.email);
    assert!(patched.updated_at.is_some());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn test_rules_are_filtered_and_ordered() {
    let Some((ctx, store)) = store().await else { return };
    let team = uuid::Uuid::new_v4();
    let high = fixtures::hot_lead_rule(team);
    let low = fixtures::industry_rule(&["SaaS"], 60.0);
    let off = fixtures::industry_rule(&["Retail"], 10.0).inactive();
    for rule in [&low, &off, &high] {
        store.save_rule(rule).await.unwrap();
    }

    let active = store.list_active_rules(&RuleFilter::default()).await.unwrap();
    let ids: Vec<_> = active.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![high.id, low.id]);

    let scoring = store
        .list_active_rules(&RuleFilter {
            rule_type: Some(RuleType::Scoring),
        })
        .await
        .unwrap();
    assert_eq!(scoring.len(), 1);
    assert_eq!(scoring[0].conditions, low.conditions);

    assert!(store.delete_rule(low.id).await.unwrap());
    assert!(!store.delete_rule(low.id).await.unwrap());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn test_workflow_steps_survive_storage() {
    let Some((ctx, store)) = store().await else { return };
    let workflow = fixtures::onboarding_workflow();
    store.save_workflow(&workflow).await.unwrap();

    let loaded = store.get_workflow(workflow.id).await.unwrap().unwrap();
    assert_eq!(loaded.steps, workflow.steps);
    assert_eq!(
        store.list_active_workflows(WorkflowTrigger::LeadCreated).await.unwrap().len(),
        1
    );
    assert!(store.list_active_workflows(WorkflowTrigger::Manual).await.unwrap().is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn test_terminal_executions_are_not_rewritten() {
    let Some((ctx, store)) = store().await else { return };
    let workflow = Workflow::new("w", WorkflowTrigger::Manual, 1);
    store.save_workflow(&workflow).await.unwrap();

    let mut execution = WorkflowExecution::start(&workflow, None, None, serde_json::Value::Null, Default::default());
    store.create_execution(&execution).await.unwrap();
    execution.finalize(ExecutionStatus::Completed, None).unwrap();
    store.update_execution(&execution).await.unwrap();

    let mut late = execution.clone();
    late.status = ExecutionStatus::Failed;
    late.error_message = Some("late writer".to_string());
    let _ = store.update_execution(&late).await;

    let stored = store.get_execution(execution.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);
    assert!(stored.error_message.is_none());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn test_stale_executions_are_failed() {
    let Some((ctx, store)) = store().await else { return };
    let workflow = Workflow::new("w", WorkflowTrigger::Manual, 1);
    store.save_workflow(&workflow).await.unwrap();

    let mut stale = WorkflowExecution::start(&workflow, None, None, serde_json::Value::Null, Default::default());
    stale.started_at = Utc::now() - Duration::hours(4);
    let fresh = WorkflowExecution::start(&workflow, None, None, serde_json::Value::Null, Default::default());
    store.create_execution(&stale).await.unwrap();
    store.create_execution(&fresh).await.unwrap();

    let failed = store
        .fail_stale_executions(Utc::now() - Duration::hours(1), "abandoned")
        .await
        .unwrap();
    assert_eq!(failed, 1);

    let history = store.list_executions(workflow.id, 10).await.unwrap();
    assert_eq!(history[0].id, fresh.id);
    assert_eq!(history[1].status, ExecutionStatus::Failed);

    ctx.cleanup().await;
}
