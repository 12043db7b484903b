// Action Applier - turns actions into record writes and side-effect intents

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use leadgen_shared::{Action, ActionType, FieldValue, LeadPatch, LeadRecord, LeadStatus};

use super::collaborators::{EnrichmentRequest, Notification, SideEffects};
use super::conditions::RecordView;
use super::templates;

const MIN_SCORE: f64 = 0.0;
const MAX_SCORE: f64 = 100.0;
const DEFAULT_SUBJECT: &str = "Lead automation notification";

/// Result of applying one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action_type: ActionType,
    pub target: String,
    pub success: bool,
    /// Effective value written or sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Adjustments made on the way, e.g. score clamping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl ActionOutcome {
    pub fn success(action: &Action, value: serde_json::Value) -> Self {
        Self {
            action_type: action.action_type.clone(),
            target: action.target.clone(),
            success: true,
            value: Some(value),
            note: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failure(action: &Action, error: impl Into<String>) -> Self {
        Self {
            action_type: action.action_type.clone(),
            target: action.target.clone(),
            success: false,
            value: None,
            note: None,
            error: Some(error.into()),
            duration_ms: 0,
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Per-action outcomes plus the merged attribute writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedActions {
    pub outcomes: Vec<ActionOutcome>,
    pub patch: LeadPatch,
}

impl AppliedActions {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn first_error(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|o| o.error.as_deref())
    }
}

/// What an action resolves to before anything is touched
#[derive(Debug, Clone, PartialEq)]
enum Planned {
    Write {
        patch: LeadPatch,
        value: serde_json::Value,
        note: Option<String>,
    },
    Notify(Notification),
    Enrich(EnrichmentRequest),
    Invalid(String),
}

fn plan(action: &Action, view: &RecordView<'_>, default_recipients: &[String]) -> Planned {
    match &action.action_type {
        ActionType::Assignment => plan_assignment(action, view.lead),
        ActionType::Scoring => plan_scoring(action, view.lead),
        ActionType::StatusChange => plan_status_change(action, view.lead),
        ActionType::Notification => plan_notification(action, view, default_recipients),
        ActionType::Enrichment => plan_enrichment(action, view.lead),
        ActionType::Unsupported(raw) => Planned::Invalid(format!("unsupported action type '{}'", raw)),
    }
}

fn text_value(action: &Action) -> Option<String> {
    action
        .value
        .as_ref()
        .map(FieldValue::to_display_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn plan_assignment(action: &Action, lead: Option<&LeadRecord>) -> Planned {
    if lead.is_none() {
        return Planned::Invalid("assignment needs a lead record".to_string());
    }
    let Some(raw) = text_value(action) else {
        return Planned::Invalid("assignment has no value".to_string());
    };
    let Ok(assignee) = Uuid::parse_str(&raw) else {
        return Planned::Invalid(format!("'{}' is not a valid assignee id", raw));
    };

    let mut patch = LeadPatch::default();
    match action.target.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
        "user" | "assignedto" | "owner" => patch.assigned_to = Some(assignee),
        "team" | "assignedteam" => patch.assigned_team = Some(assignee),
        other => return Planned::Invalid(format!("unknown assignment target '{}'", other)),
    }

    Planned::Write {
        patch,
        value: serde_json::json!(assignee),
        note: None,
    }
}

fn plan_scoring(action: &Action, lead: Option<&LeadRecord>) -> Planned {
    if lead.is_none() {
        return Planned::Invalid("scoring needs a lead record".to_string());
    }
    let Some(requested) = action.value.as_ref().and_then(FieldValue::as_number) else {
        return Planned::Invalid(format!(
            "score value '{}' is not numeric",
            action.value.as_ref().map(|v| v.to_display_string()).unwrap_or_default()
        ));
    };

    let rounded = requested.round();
    let clamped = rounded.clamp(MIN_SCORE, MAX_SCORE);
    let note = (clamped != rounded).then(|| format!("score {} clamped to {}", requested, clamped));
    let score = clamped as i32;

    Planned::Write {
        patch: LeadPatch {
            score: Some(score),
            ..Default::default()
        },
        value: serde_json::json!(score),
        note,
    }
}

fn plan_status_change(action: &Action, lead: Option<&LeadRecord>) -> Planned {
    if lead.is_none() {
        return Planned::Invalid("status change needs a lead record".to_string());
    }
    let Some(raw) = text_value(action) else {
        return Planned::Invalid("status change has no value".to_string());
    };

    match raw.parse::<LeadStatus>() {
        Ok(status) => Planned::Write {
            patch: LeadPatch {
                status: Some(status),
                ..Default::default()
            },
            value: serde_json::json!(status),
            note: None,
        },
        Err(e) => Planned::Invalid(e.to_string()),
    }
}

/// Recipients from `metadata.recipients` as a list or comma-separated string.
pub(crate) fn recipients_from(metadata: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    };

    match metadata.get("recipients") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .flat_map(split)
            .collect(),
        Some(serde_json::Value::String(s)) => split(s),
        _ => Vec::new(),
    }
}

pub(crate) fn build_notification(
    message: &str,
    subject: Option<&str>,
    explicit_recipients: Vec<String>,
    view: &RecordView<'_>,
    default_recipients: &[String],
) -> Result<Notification, String> {
    let message = templates::render(message, view);
    if message.trim().is_empty() {
        return Err("notification has no message".to_string());
    }

    let recipients = if explicit_recipients.is_empty() {
        default_recipients.to_vec()
    } else {
        explicit_recipients
    };
    if recipients.is_empty() {
        return Err("notification has no recipients and no default is configured".to_string());
    }

    Ok(Notification {
        subject: templates::render(subject.unwrap_or(DEFAULT_SUBJECT), view),
        message,
        recipients,
        lead_id: view.lead.map(|lead| lead.id),
    })
}

fn plan_notification(action: &Action, view: &RecordView<'_>, default_recipients: &[String]) -> Planned {
    let message = text_value(action).unwrap_or_default();
    let subject = action.metadata.get("subject").and_then(|s| s.as_str());

    match build_notification(
        &message,
        subject,
        recipients_from(&action.metadata),
        view,
        default_recipients,
    ) {
        Ok(notification) => Planned::Notify(notification),
        Err(reason) => Planned::Invalid(reason),
    }
}

fn plan_enrichment(action: &Action, lead: Option<&LeadRecord>) -> Planned {
    let Some(lead) = lead else {
        return Planned::Invalid("enrichment needs a lead record".to_string());
    };
    let provider = Some(action.target.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| text_value(action))
        .unwrap_or_else(|| "default".to_string());

    Planned::Enrich(EnrichmentRequest {
        lead_id: lead.id,
        provider,
        metadata: action.metadata.clone(),
    })
}

/// Applies actions one by one. No transaction: each action succeeds or
/// fails on its own and never blocks its siblings.
#[derive(Clone)]
pub struct ActionApplier {
    effects: SideEffects,
    default_recipients: Vec<String>,
}

impl ActionApplier {
    pub fn new(effects: SideEffects, default_recipients: Vec<String>) -> Self {
        Self {
            effects,
            default_recipients,
        }
    }

    /// Apply `actions` in order. Record writes land on `lead` immediately so
    /// later actions observe earlier ones; the merged patch is returned for
    /// the caller to persist.
    pub async fn apply(
        &self,
        actions: &[Action],
        mut lead: Option<&mut LeadRecord>,
        payload: &serde_json::Value,
    ) -> AppliedActions {
        let mut applied = AppliedActions::default();

        for action in actions {
            let started = Instant::now();
            let planned = {
                let view = RecordView {
                    lead: lead.as_deref(),
                    payload,
                };
                plan(action, &view, &self.default_recipients)
            };

            let outcome = match planned {
                Planned::Write { patch, value, note } => {
                    if let Some(record) = lead.as_deref_mut() {
                        patch.apply_to(record);
                    }
                    applied.patch.merge(patch);
                    if let Some(note) = &note {
                        info!("Action {} on '{}': {}", action.action_type, action.target, note);
                    }
                    ActionOutcome::success(action, value).with_note(note)
                }
                Planned::Notify(notification) => {
                    match self.effects.notifier.send(&notification).await {
                        Ok(()) => ActionOutcome::success(
                            action,
                            serde_json::json!({
                                "message": notification.message,
                                "recipients": notification.recipients,
                            }),
                        ),
                        Err(e) => {
                            warn!("Notification action failed: {}", e);
                            ActionOutcome::failure(action, e.to_string())
                        }
                    }
                }
                Planned::Enrich(request) => {
                    let provider = request.provider.clone();
                    match self.effects.enrichment.request(request).await {
                        Ok(()) => ActionOutcome::success(
                            action,
                            serde_json::json!({ "provider": provider, "queued": true }),
                        ),
                        Err(e) => {
                            warn!("Enrichment request failed: {}", e);
                            ActionOutcome::failure(action, e.to_string())
                        }
                    }
                }
                Planned::Invalid(reason) => {
                    debug!("Action {} rejected: {}", action.action_type, reason);
                    ActionOutcome::failure(action, reason)
                }
            };

            applied
                .outcomes
                .push(outcome.with_duration(started.elapsed().as_millis() as i64));
        }

        applied
    }
}

/// Pre-built action lists for common lead handling
pub mod presets {
    use super::*;

    /// Mark qualified and tell sales
    pub fn qualify(sales_inbox: &str) -> Vec<Action> {
        vec![
            Action::change_status(LeadStatus::Qualified.as_str()),
            Action::notify(
                "{{firstName}} {{lastName}} at {{companyName}} qualified with score {{score}}",
                &[sales_inbox],
            ),
        ]
    }

    /// Hand a lead to a team and enrich it first
    pub fn route_to_team(team_id: Uuid) -> Vec<Action> {
        vec![Action::enrich("clearbit"), Action::assign_team(team_id)]
    }

    pub fn disqualify() -> Vec<Action> {
        vec![
            Action::change_status(LeadStatus::Disqualified.as_str()),
            Action::set_score(0.0),
        ]
    }
}
