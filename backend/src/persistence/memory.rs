use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use leadgen_shared::{
    BusinessRule, ExecutionStatus, LeadPatch, LeadRecord, Workflow, WorkflowExecution, WorkflowTrigger,
};

use crate::automation::{ExecutionStore, LeadRepository, RuleFilter, RuleRepository, WorkflowRepository};
use crate::error::{AutomationError, AutomationResult};

/// Process-local store. Rules and workflows keep insertion order so ties in
/// priority resolve the same way on every run.
#[derive(Default)]
pub struct MemoryStore {
    rules: RwLock<Vec<BusinessRule>>,
    workflows: RwLock<Vec<Workflow>>,
    leads: RwLock<HashMap<Uuid, LeadRecord>>,
    executions: RwLock<HashMap<Uuid, WorkflowExecution>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

#[async_trait]
impl RuleRepository for MemoryStore {
    async fn list_active_rules(&self, filter: &RuleFilter) -> AutomationResult<Vec<BusinessRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|rule| rule.is_active)
            .filter(|rule| filter.rule_type.is_none_or(|wanted| rule.rule_type == wanted))
            .cloned()
            .collect())
    }

    async fn get_rule(&self, id: Uuid) -> AutomationResult<Option<BusinessRule>> {
        Ok(self.rules.read().await.iter().find(|rule| rule.id == id).cloned())
    }

    async fn save_rule(&self, rule: &BusinessRule) -> AutomationResult<()> {
        upsert(&mut *self.rules.write().await, rule, |existing| existing.id == rule.id);
        Ok(())
    }

    async fn delete_rule(&self, id: Uuid) -> AutomationResult<bool> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        Ok(rules.len() != before)
    }
}

#[async_trait]
impl WorkflowRepository for MemoryStore {
    async fn list_active_workflows(&self, trigger: WorkflowTrigger) -> AutomationResult<Vec<Workflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .iter()
            .filter(|workflow| workflow.is_active && workflow.trigger == trigger)
            .cloned()
            .collect())
    }

    async fn get_workflow(&self, id: Uuid) -> AutomationResult<Option<Workflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .iter()
            .find(|workflow| workflow.id == id)
            .cloned())
    }

    async fn save_workflow(&self, workflow: &Workflow) -> AutomationResult<()> {
        upsert(&mut *self.workflows.write().await, workflow, |existing| existing.id == workflow.id);
        Ok(())
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn get_lead(&self, id: Uuid) -> AutomationResult<Option<LeadRecord>> {
        Ok(self.leads.read().await.get(&id).cloned())
    }

    async fn apply_patch(&self, id: Uuid, patch: &LeadPatch) -> AutomationResult<LeadRecord> {
        let mut leads = self.leads.write().await;
        let lead = leads.get_mut(&id).ok_or(AutomationError::LeadNotFound(id))?;
        patch.apply_to(lead);
        Ok(lead.clone())
    }

    async fn save_lead(&self, lead: &LeadRecord) -> AutomationResult<()> {
        self.leads.write().await.insert(lead.id, lead.clone());
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()> {
        let mut executions = self.executions.write().await;
        let stored = executions
            .get_mut(&execution.id)
            .ok_or(AutomationError::ExecutionNotFound(execution.id))?;
        *stored = execution.clone();
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> AutomationResult<Option<WorkflowExecution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_executions(&self, workflow_id: Uuid, limit: i64) -> AutomationResult<Vec<WorkflowExecution>> {
        let mut history: Vec<WorkflowExecution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|execution| execution.workflow_id == workflow_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        history.truncate(limit.max(0) as usize);
        Ok(history)
    }

    async fn fail_stale_executions(&self, cutoff: DateTime<Utc>, message: &str) -> AutomationResult<u64> {
        let mut reconciled = 0;
        for execution in self.executions.write().await.values_mut() {
            if execution.status == ExecutionStatus::Running
                && execution.started_at < cutoff
                && execution
                    .finalize(ExecutionStatus::Failed, Some(message.to_string()))
                    .is_ok()
            {
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }
}
