// Workflow Step Runner - executes the ordered steps of one workflow invocation

use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, warn};

use leadgen_shared::{
    Action, Condition, ExecutionStateError, ExecutionStatus, LeadPatch, LeadRecord, StepResult,
    StepType, Workflow, WorkflowExecution, WorkflowStep,
};

use super::EngineOptions;
use super::actions::{ActionApplier, build_notification, recipients_from};
use super::collaborators::SideEffects;
use super::conditions::{RecordView, evaluate};
use super::templates;
use crate::error::AutomationResult;

/// Config of a `condition` step: one condition or a chain
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConditionStepConfig {
    Chain { conditions: Vec<Condition> },
    Single(Condition),
}

impl ConditionStepConfig {
    pub fn conditions(&self) -> &[Condition] {
        match self {
            Self::Chain { conditions } => conditions,
            Self::Single(condition) => std::slice::from_ref(condition),
        }
    }
}

/// Config of a `delay` step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelayConfig {
    /// Minutes; a missing duration is no wait at all
    #[serde(default)]
    pub duration: f64,
}

/// Config of a `notification` step. Recipients are read from the raw
/// config so both list and comma-separated forms work.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationStepConfig {
    pub message: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Config of an `integration` step
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationStepConfig {
    #[serde(alias = "integrationId")]
    pub integration_id: String,
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Config shapes per step type, checked before anything runs.
pub fn parse_step_config(step: &WorkflowStep) -> Result<(), String> {
    let config = step.config.clone();
    let parsed = match &step.step_type {
        StepType::Action => serde_json::from_value::<Action>(config).map(drop),
        StepType::Condition => serde_json::from_value::<ConditionStepConfig>(config).map(drop),
        StepType::Delay => serde_json::from_value::<DelayConfig>(config).map(drop),
        StepType::Notification => serde_json::from_value::<NotificationStepConfig>(config).map(drop),
        StepType::Integration => serde_json::from_value::<IntegrationStepConfig>(config).map(drop),
        StepType::Unsupported(raw) => return Err(format!("unsupported step type '{}'", raw)),
    };
    parsed.map_err(|e| format!("invalid {} config: {}", step.step_type, e))
}

/// What a workflow run hands back besides the finalized execution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Merged record writes from every `action` step, successful or not
    pub patch: LeadPatch,
    /// The record as the last step saw it
    pub lead: Option<LeadRecord>,
}

enum StepOutcome {
    Continue(serde_json::Value),
    GateStop(serde_json::Value),
    Failed { error: String, halt: bool },
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "step panicked".to_string()
    }
}

/// When a delay of `minutes` ends, or `None` past the representable range.
fn resume_at(minutes: f64) -> Option<DateTime<Utc>> {
    let seconds = minutes * 60.0;
    if !seconds.is_finite() || seconds >= i64::MAX as f64 {
        return None;
    }
    let delay = TimeDelta::try_seconds(seconds as i64)?;
    Utc::now().checked_add_signed(delay)
}

#[derive(Clone)]
pub struct StepRunner {
    applier: ActionApplier,
    effects: SideEffects,
    options: EngineOptions,
}

impl StepRunner {
    pub fn new(effects: SideEffects, options: EngineOptions) -> Self {
        Self {
            applier: ActionApplier::new(effects.clone(), options.default_recipients.clone()),
            effects,
            options,
        }
    }

    /// Run `workflow` against `lead` and finalize `execution`.
    ///
    /// Steps run in ascending `order`, each leaving exactly one entry in
    /// `step_results`. A false condition ends the run as `completed` with
    /// `gate_stopped` set. Errors returned here are state-machine misuse
    /// (the execution was not running), never step failures.
    pub async fn run(
        &self,
        workflow: &Workflow,
        execution: &mut WorkflowExecution,
        mut lead: Option<LeadRecord>,
    ) -> AutomationResult<RunReport> {
        if execution.status != ExecutionStatus::Running {
            return Err(ExecutionStateError::NotRunning {
                id: execution.id,
                status: execution.status,
            }
            .into());
        }

        let payload = execution.trigger_data.clone();
        let mut patch = LeadPatch::default();
        let mut first_error: Option<String> = None;
        let mut halted = false;

        info!(
            "Running workflow '{}' ({} steps) as execution {}",
            workflow.name,
            workflow.steps.len(),
            execution.id
        );

        for step in workflow.ordered_steps() {
            let started = Instant::now();
            let executed_at = Utc::now();

            let outcome = AssertUnwindSafe(self.execute_step(step, &mut lead, &payload, &mut patch))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| StepOutcome::Failed {
                    error: panic_message(panic),
                    halt: true,
                });

            let mut result = StepResult {
                step_name: step.name.clone(),
                step_type: step.step_type.clone(),
                order: step.order,
                success: true,
                result: None,
                error: None,
                executed_at,
                duration_ms: 0,
            };

            let stop = match outcome {
                StepOutcome::Continue(value) => {
                    result.result = Some(value);
                    false
                }
                StepOutcome::GateStop(value) => {
                    info!("Workflow '{}' stopped at condition step '{}'", workflow.name, step.name);
                    result.result = Some(value);
                    execution.gate_stopped = true;
                    true
                }
                StepOutcome::Failed { error, halt } => {
                    if halt {
                        error!("Step '{}' of workflow '{}' failed: {}", step.name, workflow.name, error);
                    } else {
                        warn!("Step '{}' of workflow '{}' failed, continuing: {}", step.name, workflow.name, error);
                    }
                    // Best-effort failures do not fail the run
                    let counts = halt || step.step_type != StepType::Notification;
                    if counts && first_error.is_none() {
                        first_error = Some(format!("step '{}': {}", step.name, error));
                    }
                    result.success = false;
                    result.error = Some(error);
                    halted = halt;
                    halt
                }
            };

            result.duration_ms = started.elapsed().as_millis() as i64;
            execution.record_step(result)?;

            if stop {
                break;
            }
        }

        let status = if first_error.is_some() {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };
        execution.finalize(status, first_error)?;

        info!(
            "Workflow '{}' execution {} finished as {} after {} steps{}",
            workflow.name,
            execution.id,
            execution.status,
            execution.step_results.len(),
            if halted { " (halted)" } else { "" }
        );

        Ok(RunReport { patch, lead })
    }

    async fn execute_step(
        &self,
        step: &WorkflowStep,
        lead: &mut Option<LeadRecord>,
        payload: &serde_json::Value,
        patch: &mut LeadPatch,
    ) -> StepOutcome {
        let halt = |error: String| StepOutcome::Failed { error, halt: true };

        match &step.step_type {
            StepType::Action => {
                let action: Action = match serde_json::from_value(step.config.clone()) {
                    Ok(action) => action,
                    Err(e) => return halt(format!("invalid action config: {}", e)),
                };

                let applied = self
                    .applier
                    .apply(std::slice::from_ref(&action), lead.as_mut(), payload)
                    .await;
                patch.merge(applied.patch);

                match applied.outcomes.into_iter().next() {
                    Some(outcome) if outcome.success => {
                        StepOutcome::Continue(serde_json::to_value(&outcome).unwrap_or_default())
                    }
                    Some(outcome) => StepOutcome::Failed {
                        error: outcome.error.unwrap_or_else(|| "action failed".to_string()),
                        halt: !self.options.continue_on_step_failure,
                    },
                    None => halt("action produced no outcome".to_string()),
                }
            }
            StepType::Condition => {
                let config: ConditionStepConfig = match serde_json::from_value(step.config.clone()) {
                    Ok(config) => config,
                    Err(e) => return halt(format!("invalid condition config: {}", e)),
                };
                let view = RecordView {
                    lead: lead.as_ref(),
                    payload,
                };

                if evaluate(config.conditions(), &view) {
                    StepOutcome::Continue(serde_json::json!({ "passed": true }))
                } else {
                    StepOutcome::GateStop(serde_json::json!({ "passed": false }))
                }
            }
            StepType::Delay => {
                let config: DelayConfig = match serde_json::from_value(step.config.clone()) {
                    Ok(config) => config,
                    Err(e) => return halt(format!("invalid delay config: {}", e)),
                };
                if config.duration < 0.0 {
                    return halt(format!("delay duration {} is negative", config.duration));
                }

                // Resumption belongs to the surrounding scheduler
                let resume_at = resume_at(config.duration);
                StepOutcome::Continue(serde_json::json!({
                    "delayMinutes": config.duration,
                    "resumeAt": resume_at,
                }))
            }
            StepType::Notification => {
                let config: NotificationStepConfig = match serde_json::from_value(step.config.clone()) {
                    Ok(config) => config,
                    Err(e) => return halt(format!("invalid notification config: {}", e)),
                };
                let explicit = step
                    .config
                    .as_object()
                    .map(recipients_from)
                    .unwrap_or_default();
                let view = RecordView {
                    lead: lead.as_ref(),
                    payload,
                };

                let notification = match build_notification(
                    &config.message,
                    config.subject.as_deref(),
                    explicit,
                    &view,
                    &self.options.default_recipients,
                ) {
                    Ok(notification) => notification,
                    Err(error) => return StepOutcome::Failed { error, halt: false },
                };

                match self.effects.notifier.send(&notification).await {
                    Ok(()) => StepOutcome::Continue(serde_json::json!({
                        "message": notification.message,
                        "recipients": notification.recipients,
                    })),
                    Err(e) => StepOutcome::Failed {
                        error: e.to_string(),
                        halt: false,
                    },
                }
            }
            StepType::Integration => {
                let config: IntegrationStepConfig = match serde_json::from_value(step.config.clone()) {
                    Ok(config) => config,
                    Err(e) => return halt(format!("invalid integration config: {}", e)),
                };
                let view = RecordView {
                    lead: lead.as_ref(),
                    payload,
                };
                let data = templates::render_json(&config.data, &view);

                match self
                    .effects
                    .integrations
                    .invoke(&config.integration_id, &config.action, &data)
                    .await
                {
                    Ok(response) => StepOutcome::Continue(response),
                    Err(e) => halt(e.to_string()),
                }
            }
            StepType::Unsupported(raw) => halt(format!("unsupported step type '{}'", raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::collaborators::{
        MockEnrichmentRequester, MockIntegrationInvoker, MockNotificationSender,
    };
    use crate::error::AutomationError;
    use leadgen_shared::{ExecutionOutcome, LeadStatus, WorkflowTrigger};
    use std::sync::Arc;

    fn runner(
        notifier: MockNotificationSender,
        integrations: MockIntegrationInvoker,
        options: EngineOptions,
    ) -> StepRunner {
        StepRunner::new(
            SideEffects::new(
                Arc::new(notifier),
                Arc::new(integrations),
                Arc::new(MockEnrichmentRequester::new()),
            ),
            options,
        )
    }

    fn quiet_runner() -> StepRunner {
        runner(
            MockNotificationSender::new(),
            MockIntegrationInvoker::new(),
            EngineOptions::default(),
        )
    }

    fn start(workflow: &Workflow, lead: &LeadRecord) -> WorkflowExecution {
        WorkflowExecution::start(
            workflow,
            Some(lead.id),
            None,
            serde_json::json!({ "source": "test" }),
            serde_json::Map::new(),
        )
    }

    fn status_step(status: &str) -> serde_json::Value {
        serde_json::json!({ "type": "status_change", "target": "status", "value": status })
    }

    #[tokio::test]
    async fn test_condition_gate_stops_cleanly() {
        let workflow = Workflow::new("gate", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Action, "contact", status_step("CONTACTED"))
            .with_step(
                StepType::Condition,
                "only enterprise",
                serde_json::json!({ "field": "industry", "operator": "equals", "value": "Enterprise" }),
            )
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        let report = quiet_runner().run(&workflow, &mut execution, Some(lead)).await.unwrap();

        assert_eq!(execution.step_results.len(), 2);
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert!(execution.gate_stopped);
        assert_eq!(execution.outcome(), ExecutionOutcome::GateStopped);
        assert!(execution.error_message.is_none());
        assert!(execution.step_results[1].success);
        assert_eq!(execution.step_results[1].result, Some(serde_json::json!({ "passed": false })));
        assert_eq!(report.lead.unwrap().status, LeadStatus::Contacted);
        assert_eq!(report.patch.status, Some(LeadStatus::Contacted));
    }

    #[tokio::test]
    async fn test_integration_failure_halts_and_fails() {
        let mut integrations = MockIntegrationInvoker::new();
        integrations
            .expect_invoke()
            .withf(|id, action, data| id == "crm" && action == "sync" && data["email"] == "ada@acme.io")
            .times(1)
            .returning(|id, _, _| {
                Err(AutomationError::Integration {
                    integration: id.to_string(),
                    message: "HTTP 502".to_string(),
                })
            });
        let workflow = Workflow::new("sync", WorkflowTrigger::LeadCreated, 10)
            .with_step(StepType::Action, "score", serde_json::json!({ "type": "scoring", "target": "score", "value": 40 }))
            .with_step(
                StepType::Integration,
                "push to crm",
                serde_json::json!({ "integrationId": "crm", "action": "sync", "data": { "email": "{{email}}" } }),
            );
        let lead = LeadRecord {
            email: "ada@acme.io".to_string(),
            ..Default::default()
        };
        let mut execution = start(&workflow, &lead);

        let report = runner(MockNotificationSender::new(), integrations, EngineOptions::default())
            .run(&workflow, &mut execution, Some(lead))
            .await
            .unwrap();

        assert_eq!(execution.step_results.len(), 2);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error_message.as_deref().unwrap().contains("HTTP 502"));
        assert!(execution.completed_at.is_some());
        // the earlier write is still reported for the caller to persist
        assert_eq!(report.patch.score, Some(40));
    }

    #[tokio::test]
    async fn test_notification_failure_is_best_effort() {
        let mut notifier = MockNotificationSender::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_| Err(AutomationError::Notification("mailbox full".to_string())));
        let workflow = Workflow::new("notify", WorkflowTrigger::LeadScored, 10)
            .with_step(
                StepType::Notification,
                "tell sales",
                serde_json::json!({ "message": "Lead {{email}} scored", "recipients": "sales@acme.io" }),
            )
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        runner(notifier, MockIntegrationInvoker::new(), EngineOptions::default())
            .run(&workflow, &mut execution, Some(lead))
            .await
            .unwrap();

        assert_eq!(execution.step_results.len(), 2);
        assert!(!execution.step_results[0].success);
        assert!(execution.step_results[1].success);
        assert_eq!(execution.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_action_halts_by_default() {
        let workflow = Workflow::new("bad status", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Action, "broken", status_step("HOT"))
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        let report = quiet_runner().run(&workflow, &mut execution, Some(lead)).await.unwrap();

        assert_eq!(execution.step_results.len(), 1);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(report.lead.unwrap().status, LeadStatus::Raw);
    }

    #[tokio::test]
    async fn test_continue_on_step_failure() {
        let workflow = Workflow::new("bad status", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Action, "broken", status_step("HOT"))
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);
        let options = EngineOptions {
            continue_on_step_failure: true,
            ..Default::default()
        };

        let report = runner(MockNotificationSender::new(), MockIntegrationInvoker::new(), options)
            .run(&workflow, &mut execution, Some(lead))
            .await
            .unwrap();

        assert_eq!(execution.step_results.len(), 2);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error_message.as_deref().unwrap().contains("broken"));
        assert_eq!(report.lead.unwrap().status, LeadStatus::Qualified);
    }

    #[tokio::test]
    async fn test_delay_and_unsupported_steps() {
        let workflow = Workflow::new("wait", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Delay, "wait a day", serde_json::json!({ "duration": 1440 }))
            .with_step(StepType::Delay, "no wait", serde_json::json!({}))
            .with_step(StepType::Unsupported("script".to_string()), "run script", serde_json::json!({}))
            .with_step(StepType::Delay, "never", serde_json::json!({ "duration": 5 }));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        quiet_runner().run(&workflow, &mut execution, Some(lead)).await.unwrap();

        assert_eq!(execution.step_results.len(), 3);
        assert_eq!(execution.step_results[0].result.as_ref().unwrap()["delayMinutes"], 1440.0);
        assert_eq!(execution.step_results[1].result.as_ref().unwrap()["delayMinutes"], 0.0);
        assert_eq!(
            execution.step_results[2].error.as_deref(),
            Some("unsupported step type 'script'")
        );
        assert_eq!(execution.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_panicking_step_is_recorded() {
        let mut integrations = MockIntegrationInvoker::new();
        integrations
            .expect_invoke()
            .returning(|_, _, _| panic!("connector exploded"));
        let workflow = Workflow::new("panic", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Integration, "call", serde_json::json!({ "integration_id": "x", "action": "y" }))
            .with_step(StepType::Delay, "after", serde_json::json!({ "duration": 1 }));
        let mut execution = start(&workflow, &LeadRecord::default());

        runner(MockNotificationSender::new(), integrations, EngineOptions::default())
            .run(&workflow, &mut execution, None)
            .await
            .unwrap();

        assert_eq!(execution.step_results.len(), 1);
        assert_eq!(execution.step_results[0].error.as_deref(), Some("connector exploded"));
        assert_eq!(execution.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_steps_run_in_order_field_sequence() {
        let mut workflow = Workflow::new("shuffled", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Action, "first", status_step("CONTACTED"))
            .with_step(StepType::Action, "second", status_step("NURTURING"));
        workflow.steps.reverse();
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        let report = quiet_runner().run(&workflow, &mut execution, Some(lead)).await.unwrap();

        let names: Vec<&str> = execution.step_results.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(report.lead.unwrap().status, LeadStatus::Nurturing);
    }

    #[tokio::test]
    async fn test_finalized_execution_cannot_run_again() {
        let workflow = Workflow::new("once", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Delay, "wait", serde_json::json!({ "duration": 1 }));
        let mut execution = start(&workflow, &LeadRecord::default());
        let runner = quiet_runner();

        runner.run(&workflow, &mut execution, None).await.unwrap();
        let again = runner.run(&workflow, &mut execution, None).await;

        assert!(matches!(again, Err(AutomationError::ExecutionState(_))));
        assert_eq!(execution.step_results.len(), 1);
    }

    #[tokio::test]
    async fn test_finalized_execution_has_no_side_effects() {
        let mut notifier = MockNotificationSender::new();
        notifier.expect_send().times(0);
        let workflow = Workflow::new("once", WorkflowTrigger::Manual, 10)
            .with_step(
                StepType::Notification,
                "tell sales",
                serde_json::json!({ "message": "again", "recipients": "sales@acme.io" }),
            )
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);
        execution.finalize(ExecutionStatus::Cancelled, None).unwrap();

        let again = runner(notifier, MockIntegrationInvoker::new(), EngineOptions::default())
            .run(&workflow, &mut execution, Some(lead))
            .await;

        assert!(matches!(
            again,
            Err(AutomationError::ExecutionState(ExecutionStateError::NotRunning {
                status: ExecutionStatus::Cancelled,
                ..
            }))
        ));
        assert!(execution.step_results.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_notifier_fails_the_run() {
        let mut notifier = MockNotificationSender::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_| panic!("smtp client exploded"));
        let workflow = Workflow::new("notify", WorkflowTrigger::LeadScored, 10)
            .with_step(
                StepType::Notification,
                "tell sales",
                serde_json::json!({ "message": "Lead {{email}} scored", "recipients": "sales@acme.io" }),
            )
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        let report = runner(notifier, MockIntegrationInvoker::new(), EngineOptions::default())
            .run(&workflow, &mut execution, Some(lead))
            .await
            .unwrap();

        assert_eq!(execution.step_results.len(), 1);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_ne!(execution.outcome(), ExecutionOutcome::Succeeded);
        assert!(execution.error_message.as_deref().unwrap().contains("smtp client exploded"));
        assert!(report.patch.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_notification_fails_the_run() {
        let workflow = Workflow::new("notify", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Notification, "tell sales", serde_json::json!({ "recipients": 7 }))
            .with_step(StepType::Action, "qualify", status_step("QUALIFIED"));
        let lead = LeadRecord::default();
        let mut execution = start(&workflow, &lead);

        quiet_runner().run(&workflow, &mut execution, Some(lead)).await.unwrap();

        assert_eq!(execution.step_results.len(), 1);
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error_message.is_some());
    }

    #[tokio::test]
    async fn test_oversized_delay_has_no_resume_time() {
        let workflow = Workflow::new("forever", WorkflowTrigger::Manual, 10)
            .with_step(StepType::Delay, "wait", serde_json::json!({ "duration": 1.0e12 }))
            .with_step(StepType::Delay, "far", serde_json::json!({ "duration": 1.0e300 }));
        let mut execution = start(&workflow, &LeadRecord::default());

        quiet_runner().run(&workflow, &mut execution, None).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.step_results.len(), 2);
        for step in &execution.step_results {
            assert!(step.success);
            assert!(step.result.as_ref().unwrap()["resumeAt"].is_null());
        }
        assert!(resume_at(60.0).is_some());
    }

    #[test]
    fn test_parse_step_config() {
        let ok = WorkflowStep::new(StepType::Integration, "i", 1, serde_json::json!({ "integrationId": "a", "action": "b" }));
        assert!(parse_step_config(&ok).is_ok());

        let missing = WorkflowStep::new(StepType::Notification, "n", 1, serde_json::json!({}));
        assert!(parse_step_config(&missing).unwrap_err().contains("notification"));

        let chain = WorkflowStep::new(
            StepType::Condition,
            "c",
            1,
            serde_json::json!({ "conditions": [{ "field": "score", "operator": "greater_than", "value": 1 }] }),
        );
        assert!(parse_step_config(&chain).is_ok());
    }
}
