// Event applicability for rules and workflows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use leadgen_shared::{BusinessRule, EventKind, LeadStatus, RuleType, Workflow, WorkflowTrigger};

/// Something that happened to a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    #[serde(rename = "event", alias = "kind")]
    pub kind: EventKind,
    #[serde(alias = "leadId")]
    pub lead_id: Uuid,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default = "Utc::now", alias = "occurredAt")]
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(kind: EventKind, lead_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            kind,
            lead_id,
            payload,
            occurred_at: Utc::now(),
        }
    }

    pub fn lead_created(lead_id: Uuid) -> Self {
        Self::new(EventKind::LeadCreated, lead_id, serde_json::json!({}))
    }

    pub fn lead_updated(lead_id: Uuid, changes: serde_json::Value) -> Self {
        Self::new(EventKind::LeadUpdated, lead_id, serde_json::json!({ "changes": changes }))
    }

    pub fn lead_scored(lead_id: Uuid, previous: i32, current: i32) -> Self {
        Self::new(
            EventKind::LeadScored,
            lead_id,
            serde_json::json!({ "previousScore": previous, "score": current }),
        )
    }

    pub fn lead_status_changed(lead_id: Uuid, from: LeadStatus, to: LeadStatus) -> Self {
        Self::new(
            EventKind::LeadStatusChanged,
            lead_id,
            serde_json::json!({ "previousStatus": from, "status": to }),
        )
    }

    pub fn manual(lead_id: Uuid, payload: serde_json::Value) -> Self {
        Self::new(EventKind::Manual, lead_id, payload)
    }
}

/// Whether `rule` takes part in dispatching `event`.
///
/// An explicit `triggers` list scopes the rule. Otherwise a rule applies to
/// every event except the one its own actions raise: scoring rules skip
/// `lead_scored` and status rules skip `lead_status_changed`, so a rule
/// cannot re-trigger itself.
pub fn rule_applies_to(rule: &BusinessRule, event: EventKind) -> bool {
    if !rule.is_active {
        return false;
    }
    if !rule.triggers.is_empty() {
        return rule.triggers.contains(&event);
    }

    !matches!(
        (rule.rule_type, event),
        (RuleType::Scoring, EventKind::LeadScored)
            | (RuleType::StatusChange, EventKind::LeadStatusChanged)
    )
}

/// Workflows bind to exactly one trigger.
pub fn workflow_applies_to(workflow: &Workflow, event: EventKind) -> bool {
    workflow.is_active && WorkflowTrigger::for_event(event) == Some(workflow.trigger)
}
