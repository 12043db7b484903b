// Contracts the automation core consumes
//
// The engine never touches storage, SMTP or HTTP directly. Everything goes
// through these traits so the same engine runs against Postgres, the
// in-memory store, or dry-run doubles for previews.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use leadgen_shared::{
    BusinessRule, LeadPatch, LeadRecord, RuleType, Workflow, WorkflowExecution, WorkflowTrigger,
};

use crate::error::AutomationResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub rule_type: Option<RuleType>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules, optionally narrowed to one type. Order is unspecified.
    async fn list_active_rules(&self, filter: &RuleFilter) -> AutomationResult<Vec<BusinessRule>>;
    async fn get_rule(&self, id: Uuid) -> AutomationResult<Option<BusinessRule>>;
    /// Insert or replace by id
    async fn save_rule(&self, rule: &BusinessRule) -> AutomationResult<()>;
    /// Returns whether a rule was removed
    async fn delete_rule(&self, id: Uuid) -> AutomationResult<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn list_active_workflows(&self, trigger: WorkflowTrigger) -> AutomationResult<Vec<Workflow>>;
    async fn get_workflow(&self, id: Uuid) -> AutomationResult<Option<Workflow>>;
    async fn save_workflow(&self, workflow: &Workflow) -> AutomationResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn get_lead(&self, id: Uuid) -> AutomationResult<Option<LeadRecord>>;
    /// Apply attribute writes and return the updated record
    async fn apply_patch(&self, id: Uuid, patch: &LeadPatch) -> AutomationResult<LeadRecord>;
    async fn save_lead(&self, lead: &LeadRecord) -> AutomationResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()>;
    /// Persist the terminal state of an execution
    async fn update_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()>;
    async fn get_execution(&self, id: Uuid) -> AutomationResult<Option<WorkflowExecution>>;
    /// Most recent first
    async fn list_executions(&self, workflow_id: Uuid, limit: i64) -> AutomationResult<Vec<WorkflowExecution>>;
    /// Fail every `running` execution started before `cutoff`; returns how many
    async fn fail_stale_executions(&self, cutoff: DateTime<Utc>, message: &str) -> AutomationResult<u64>;
}

/// A notification intent after template rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub recipients: Vec<String>,
    pub lead_id: Option<Uuid>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> AutomationResult<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IntegrationInvoker: Send + Sync {
    /// Call `action` on integration `integration_id`; any error is a failed outcome
    async fn invoke(
        &self,
        integration_id: &str,
        action: &str,
        data: &serde_json::Value,
    ) -> AutomationResult<serde_json::Value>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub lead_id: Uuid,
    pub provider: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait EnrichmentRequester: Send + Sync {
    /// Fire and forget: returns once the request is accepted, not completed
    async fn request(&self, request: EnrichmentRequest) -> AutomationResult<()>;
}

/// The outward-facing collaborators actions and steps use
#[derive(Clone)]
pub struct SideEffects {
    pub notifier: Arc<dyn NotificationSender>,
    pub integrations: Arc<dyn IntegrationInvoker>,
    pub enrichment: Arc<dyn EnrichmentRequester>,
}

impl SideEffects {
    pub fn new(
        notifier: Arc<dyn NotificationSender>,
        integrations: Arc<dyn IntegrationInvoker>,
        enrichment: Arc<dyn EnrichmentRequester>,
    ) -> Self {
        Self {
            notifier,
            integrations,
            enrichment,
        }
    }
}
