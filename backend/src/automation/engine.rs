// Trigger Dispatcher - routes domain events to rules and workflows

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use leadgen_shared::{
    BusinessRule, EventKind, ExecutionStatus, LeadPatch, LeadRecord, Workflow, WorkflowExecution,
    WorkflowTrigger,
};

use super::EngineOptions;
use super::actions::{ActionApplier, ActionOutcome};
use super::collaborators::{
    ExecutionStore, LeadRepository, RuleFilter, RuleRepository, SideEffects, WorkflowRepository,
};
use super::conditions::RecordView;
use super::dry_run::{DryRun, RecordedIntents};
use super::executor::StepRunner;
use super::rules::{MatchMode, MatchResult, match_rule, match_rules};
use super::triggers::{DomainEvent, rule_applies_to, workflow_applies_to};
use crate::error::{AutomationError, AutomationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationKind {
    Rule,
    Workflow,
}

/// What happened to one rule or workflow during a dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub kind: AutomationKind,
    pub id: Uuid,
    pub name: String,
    pub priority: i32,
    /// Rule matched, or workflow ran
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub gate_stopped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of testing one rule against a synthetic lead
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTestReport {
    #[serde(rename = "match")]
    pub result: MatchResult,
    pub actions: Vec<ActionOutcome>,
    /// The synthetic lead after the matched actions
    pub lead: LeadRecord,
    pub intents: RecordedIntents,
}

/// Result of previewing a workflow; nothing was persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowPreview {
    pub execution: WorkflowExecution,
    pub lead: Option<LeadRecord>,
    pub intents: RecordedIntents,
}

enum Scheduled {
    Rule(BusinessRule),
    Workflow(Workflow),
}

impl Scheduled {
    fn priority(&self) -> i32 {
        match self {
            Self::Rule(rule) => rule.priority,
            Self::Workflow(workflow) => workflow.priority,
        }
    }
}

/// One priority-descending sequence. Rules are queued ahead of workflows
/// and the sort is stable, so rules win ties.
fn schedule(rules: Vec<BusinessRule>, workflows: Vec<Workflow>) -> Vec<Scheduled> {
    let mut queue: Vec<Scheduled> = rules
        .into_iter()
        .map(Scheduled::Rule)
        .chain(workflows.into_iter().map(Scheduled::Workflow))
        .collect();
    queue.sort_by_key(|item| Reverse(item.priority()));
    queue
}

#[derive(Clone)]
pub struct AutomationEngine {
    rules: Arc<dyn RuleRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    leads: Arc<dyn LeadRepository>,
    executions: Arc<dyn ExecutionStore>,
    effects: SideEffects,
    options: EngineOptions,
}

impl AutomationEngine {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        leads: Arc<dyn LeadRepository>,
        executions: Arc<dyn ExecutionStore>,
        effects: SideEffects,
        options: EngineOptions,
    ) -> Self {
        Self {
            rules,
            workflows,
            leads,
            executions,
            effects,
            options,
        }
    }

    /// Engine over a single store implementing every repository.
    pub fn with_store<S>(store: Arc<S>, effects: SideEffects, options: EngineOptions) -> Self
    where
        S: RuleRepository + WorkflowRepository + LeadRepository + ExecutionStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store, effects, options)
    }

    /// Run every applicable rule and workflow for `event`.
    ///
    /// The lead is re-read after each rule or workflow, so later ones see
    /// earlier writes. Repository failures abort the dispatch; rule action
    /// and workflow step failures are reported in the summaries.
    pub async fn dispatch(&self, event: &DomainEvent) -> AutomationResult<Vec<ExecutionSummary>> {
        let mut lead = self
            .leads
            .get_lead(event.lead_id)
            .await?
            .ok_or(AutomationError::LeadNotFound(event.lead_id))?;

        let rules: Vec<BusinessRule> = self
            .rules
            .list_active_rules(&RuleFilter::default())
            .await?
            .into_iter()
            .filter(|rule| rule_applies_to(rule, event.kind))
            .collect();

        let workflows: Vec<Workflow> = match WorkflowTrigger::for_event(event.kind) {
            Some(trigger) => self
                .workflows
                .list_active_workflows(trigger)
                .await?
                .into_iter()
                .filter(|workflow| workflow_applies_to(workflow, event.kind))
                .collect(),
            None => Vec::new(),
        };

        info!(
            "Dispatching {} for lead {}: {} rules, {} workflows",
            event.kind,
            lead.id,
            rules.len(),
            workflows.len()
        );

        let applier = ActionApplier::new(self.effects.clone(), self.options.default_recipients.clone());
        let runner = StepRunner::new(self.effects.clone(), self.options.clone());
        let mut summaries = Vec::new();

        for item in schedule(rules, workflows) {
            match item {
                Scheduled::Rule(rule) => {
                    let result = {
                        let view = RecordView {
                            lead: Some(&lead),
                            payload: &event.payload,
                        };
                        match_rule(&rule, &view, self.options.empty_rule_policy)
                    };

                    let mut summary = ExecutionSummary {
                        kind: AutomationKind::Rule,
                        id: rule.id,
                        name: rule.name.clone(),
                        priority: rule.priority,
                        matched: result.matched,
                        actions: Vec::new(),
                        execution_id: None,
                        status: None,
                        gate_stopped: false,
                        error: None,
                    };

                    if result.matched {
                        let mut working = lead.clone();
                        let applied = applier
                            .apply(&result.actions, Some(&mut working), &event.payload)
                            .await;
                        summary.error = applied.first_error().map(str::to_string);
                        summary.actions = applied.outcomes;
                        lead = self.refresh(lead.id, &applied.patch).await?;
                    }

                    summaries.push(summary);
                }
                Scheduled::Workflow(workflow) => {
                    let (execution, _) = self
                        .run_persisted(
                            &runner,
                            &workflow,
                            Some(lead.clone()),
                            Some(event.kind),
                            event.payload.clone(),
                        )
                        .await?;
                    lead = self
                        .leads
                        .get_lead(lead.id)
                        .await?
                        .ok_or(AutomationError::LeadNotFound(lead.id))?;

                    summaries.push(ExecutionSummary {
                        kind: AutomationKind::Workflow,
                        id: workflow.id,
                        name: workflow.name.clone(),
                        priority: workflow.priority,
                        matched: true,
                        actions: Vec::new(),
                        execution_id: Some(execution.id),
                        status: Some(execution.status),
                        gate_stopped: execution.gate_stopped,
                        error: execution.error_message.clone(),
                    });
                }
            }
        }

        info!(
            "Dispatch of {} for lead {} done: {} rules matched, {} workflows run",
            event.kind,
            lead.id,
            summaries
                .iter()
                .filter(|s| s.kind == AutomationKind::Rule && s.matched)
                .count(),
            summaries
                .iter()
                .filter(|s| s.kind == AutomationKind::Workflow)
                .count()
        );

        Ok(summaries)
    }

    /// Persist `patch` if there is one and return the current lead.
    async fn refresh(&self, lead_id: Uuid, patch: &LeadPatch) -> AutomationResult<LeadRecord> {
        if patch.is_empty() {
            return self
                .leads
                .get_lead(lead_id)
                .await?
                .ok_or(AutomationError::LeadNotFound(lead_id));
        }
        self.leads.apply_patch(lead_id, patch).await
    }

    /// Create the execution record, run, write the lead, record the end state.
    async fn run_persisted(
        &self,
        runner: &StepRunner,
        workflow: &Workflow,
        lead: Option<LeadRecord>,
        event: Option<EventKind>,
        trigger_data: serde_json::Value,
    ) -> AutomationResult<(WorkflowExecution, Option<LeadRecord>)> {
        let lead_id = lead.as_ref().map(|lead| lead.id);
        let mut execution = WorkflowExecution::start(workflow, lead_id, event, trigger_data, serde_json::Map::new());
        self.executions.create_execution(&execution).await?;

        let report = runner.run(workflow, &mut execution, lead).await?;
        // The end state is stored before the lead write so a failed write
        // never leaves the row running
        self.executions.update_execution(&execution).await?;

        // Writes from steps that ran before a failure stand
        let lead = match (lead_id, report.patch.is_empty()) {
            (Some(id), false) => Some(self.leads.apply_patch(id, &report.patch).await?),
            _ => report.lead,
        };

        Ok((execution, lead))
    }

    /// Run one workflow by hand, optionally against a stored lead.
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        lead_id: Option<Uuid>,
        trigger_data: serde_json::Value,
    ) -> AutomationResult<WorkflowExecution> {
        let workflow = self
            .workflows
            .get_workflow(workflow_id)
            .await?
            .ok_or(AutomationError::WorkflowNotFound(workflow_id))?;
        if !workflow.is_active {
            return Err(AutomationError::InvalidDefinition(format!(
                "workflow '{}' is inactive",
                workflow.name
            )));
        }

        let lead = match lead_id {
            Some(id) => Some(
                self.leads
                    .get_lead(id)
                    .await?
                    .ok_or(AutomationError::LeadNotFound(id))?,
            ),
            None => None,
        };

        let runner = StepRunner::new(self.effects.clone(), self.options.clone());
        let (execution, _) = self
            .run_persisted(&runner, &workflow, lead, Some(EventKind::Manual), trigger_data)
            .await?;
        Ok(execution)
    }

    /// Test a rule against a synthetic lead without touching anything real.
    ///
    /// Inactive rules are tested as if active so they can be tried out
    /// before being switched on.
    pub async fn test_rule(&self, rule_id: Uuid, lead: LeadRecord) -> AutomationResult<RuleTestReport> {
        let mut rule = self
            .rules
            .get_rule(rule_id)
            .await?
            .ok_or(AutomationError::RuleNotFound(rule_id))?;
        rule.is_active = true;

        let payload = serde_json::Value::Null;
        let result = match_rules(
            std::slice::from_ref(&rule),
            &RecordView {
                lead: Some(&lead),
                payload: &payload,
            },
            self.options.empty_rule_policy,
            MatchMode::Single,
        )
        .into_iter()
        .next()
        .ok_or_else(|| AutomationError::InvalidDefinition(format!("rule '{}' was not evaluated", rule.name)))?;

        let dry_run = DryRun::new();
        let applier = ActionApplier::new(dry_run.side_effects(), self.options.default_recipients.clone());
        let mut lead = lead;
        let actions = if result.matched {
            applier.apply(&result.actions, Some(&mut lead), &payload).await.outcomes
        } else {
            Vec::new()
        };

        debug!("Tested rule '{}': matched {}", rule.name, result.matched);

        Ok(RuleTestReport {
            result,
            actions,
            lead,
            intents: dry_run.intents().await,
        })
    }

    /// Run a workflow with dry-run side effects. Nothing is persisted.
    pub async fn preview_workflow(
        &self,
        workflow_id: Uuid,
        lead: Option<LeadRecord>,
        trigger_data: serde_json::Value,
    ) -> AutomationResult<WorkflowPreview> {
        let workflow = self
            .workflows
            .get_workflow(workflow_id)
            .await?
            .ok_or(AutomationError::WorkflowNotFound(workflow_id))?;

        let dry_run = DryRun::new();
        let runner = StepRunner::new(dry_run.side_effects(), self.options.clone());
        let mut execution = WorkflowExecution::start(
            &workflow,
            lead.as_ref().map(|lead| lead.id),
            None,
            trigger_data,
            serde_json::Map::from_iter([("preview".to_string(), serde_json::Value::Bool(true))]),
        );

        let report = runner.run(&workflow, &mut execution, lead).await?;
        if execution.status == ExecutionStatus::Failed {
            warn!("Preview of workflow '{}' failed: {:?}", workflow.name, execution.error_message);
        }

        Ok(WorkflowPreview {
            execution,
            lead: report.lead,
            intents: dry_run.intents().await,
        })
    }

    pub async fn get_execution(&self, id: Uuid) -> AutomationResult<WorkflowExecution> {
        self.executions
            .get_execution(id)
            .await?
            .ok_or(AutomationError::ExecutionNotFound(id))
    }

    pub async fn list_executions(&self, workflow_id: Uuid, limit: i64) -> AutomationResult<Vec<WorkflowExecution>> {
        self.workflows
            .get_workflow(workflow_id)
            .await?
            .ok_or(AutomationError::WorkflowNotFound(workflow_id))?;
        self.executions.list_executions(workflow_id, limit).await
    }
}
