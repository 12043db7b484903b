use std::sync::Arc;

use crate::automation::{
    AutomationEngine, AutomationKind, DomainEvent, DryRun, EmptyRulePolicy, EngineOptions, LeadRepository,
    RuleRepository, WorkflowRepository,
};
use crate::persistence::MemoryStore;
use crate::tests::{fixtures, init_test_logging};
use leadgen_shared::{
    Action, BusinessRule, Condition, LeadStatus, RuleType, StepType, Workflow, WorkflowTrigger,
};

fn engine(store: &Arc<MemoryStore>, options: EngineOptions) -> AutomationEngine {
    init_test_logging();
    AutomationEngine::with_store(store.clone(), DryRun::new().side_effects(), options)
}

#[tokio::test]
async fn test_lower_priority_write_lands_last() {
    let store = Arc::new(MemoryStore::new());
    let lead = fixtures::lead_with_score(70);
    store.save_lead(&lead).await.unwrap();

    let nurture = BusinessRule::new("Nurture", RuleType::Assignment, 80)
        .with_condition(Condition::greater_than("score", 50.0))
        .with_action(Action::change_status("NURTURING"));
    let contact = BusinessRule::new("Contact", RuleType::Assignment, 20)
        .with_condition(Condition::greater_than("score", 50.0))
        .with_action(Action::change_status("CONTACTED"));
    store.save_rule(&contact).await.unwrap();
    store.save_rule(&nurture).await.unwrap();

    let results = engine(&store, EngineOptions::default())
        .dispatch(&DomainEvent::lead_updated(lead.id, serde_json::json!({})))
        .await
        .unwrap();

    let order: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["Nurture", "Contact"]);
    let stored = store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Contacted);
}

#[tokio::test]
async fn test_later_rules_see_earlier_writes() {
    let store = Arc::new(MemoryStore::new());
    let lead = fixtures::lead_with_score(10);
    store.save_lead(&lead).await.unwrap();

    let bump = BusinessRule::new("Bump SaaS", RuleType::Scoring, 90)
        .with_condition(Condition::equals("industry", "SaaS"))
        .with_action(Action::set_score(85.0));
    let qualify = BusinessRule::new("Qualify", RuleType::Assignment, 10)
        .with_condition(Condition::greater_than("score", 80.0))
        .with_action(Action::change_status("QUALIFIED"));
    store.save_rule(&bump).await.unwrap();
    store.save_rule(&qualify).await.unwrap();

    let results = engine(&store, EngineOptions::default())
        .dispatch(&DomainEvent::lead_created(lead.id))
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.matched));
    let stored = store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.score, 85);
    assert_eq!(stored.status, LeadStatus::Qualified);
}

#[tokio::test]
async fn test_rules_win_priority_ties_with_workflows() {
    let store = Arc::new(MemoryStore::new());
    let lead = fixtures::lead();
    store.save_lead(&lead).await.unwrap();

    let workflow = Workflow::new("Tie workflow", WorkflowTrigger::LeadCreated, 50).with_step(
        StepType::Action,
        "contact",
        serde_json::json!({ "type": "status_change", "target": "status", "value": "CONTACTED" }),
    );
    let rule = BusinessRule::new("Tie rule", RuleType::Assignment, 50)
        .with_action(Action::change_status("NURTURING"));
    store.save_workflow(&workflow).await.unwrap();
    store.save_rule(&rule).await.unwrap();

    let results = engine(&store, EngineOptions::default())
        .dispatch(&DomainEvent::lead_created(lead.id))
        .await
        .unwrap();

    let kinds: Vec<_> = results.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![AutomationKind::Rule, AutomationKind::Workflow]);
    let stored = store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Contacted);
}

#[tokio::test]
async fn test_inert_policy_skips_catch_all_rules() {
    let store = Arc::new(MemoryStore::new());
    let lead = fixtures::lead();
    store.save_lead(&lead).await.unwrap();
    let catch_all = BusinessRule::new("Everything", RuleType::Assignment, 5)
        .with_action(Action::change_status("LOST"));
    store.save_rule(&catch_all).await.unwrap();

    let options = EngineOptions {
        empty_rule_policy: EmptyRulePolicy::Inert,
        ..EngineOptions::default()
    };
    let results = engine(&store, options)
        .dispatch(&DomainEvent::lead_created(lead.id))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].matched);
    let stored = store.get_lead(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::Raw);
}
