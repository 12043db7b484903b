// Automation definitions: business rules, workflows and execution records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::FieldValue;

fn default_true() -> bool {
    true
}

/// Comparison operator of a condition.
///
/// Unknown operator strings deserialize to `Unsupported` so a single
/// malformed condition cannot prevent the rest of a rule set from loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    In,
    NotIn,
    Unsupported(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Unsupported(raw) => raw.as_str(),
        }
    }

    /// The operator with the opposite outcome on well-formed input.
    pub fn negated(&self) -> Self {
        match self {
            Self::Equals => Self::NotEquals,
            Self::NotEquals => Self::Equals,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            other => other.clone(),
        }
    }
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        value.as_str().to_string()
    }
}

/// Connective joining a condition to the next one in a flat chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn combine(self, accumulated: bool, next: bool) -> bool {
        match self {
            Self::And => accumulated && next,
            Self::Or => accumulated || next,
        }
    }
}

impl From<String> for LogicalOperator {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

impl From<LogicalOperator> for String {
    fn from(value: LogicalOperator) -> Self {
        match value {
            LogicalOperator::And => "AND".to_string(),
            LogicalOperator::Or => "OR".to_string(),
        }
    }
}

/// A single test against one attribute of the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Option<FieldValue>,
    /// Joins this condition's accumulated result with the next condition
    #[serde(default, alias = "logicalOperator")]
    pub logical_operator: LogicalOperator,
}

impl Condition {
    pub fn new(field: &str, operator: ConditionOperator, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: Some(value.into()),
            logical_operator: LogicalOperator::And,
        }
    }

    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    pub fn not_equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::NotEquals, value)
    }

    pub fn greater_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::GreaterThan, value)
    }

    pub fn less_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::LessThan, value)
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Contains, value)
    }

    pub fn in_list(field: &str, values: Vec<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::In, FieldValue::List(values))
    }

    pub fn not_in_list(field: &str, values: Vec<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::NotIn, FieldValue::List(values))
    }

    pub fn or(mut self) -> Self {
        self.logical_operator = LogicalOperator::Or;
        self
    }
}

/// Kind of effect an action has
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Assignment,
    Scoring,
    Notification,
    StatusChange,
    Enrichment,
    Unsupported(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Assignment => "assignment",
            Self::Scoring => "scoring",
            Self::Notification => "notification",
            Self::StatusChange => "status_change",
            Self::Enrichment => "enrichment",
            Self::Unsupported(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Self::Assignment,
            "scoring" => Self::Scoring,
            "notification" => Self::Notification,
            "status_change" => Self::StatusChange,
            "enrichment" => Self::Enrichment,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

/// An effect requested when a rule matches or an action step runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", alias = "action_type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub value: Option<FieldValue>,
    /// Side-channel data such as notification recipients
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    pub fn new(action_type: ActionType, target: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            action_type,
            target: target.to_string(),
            value: Some(value.into()),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn assign_user(user_id: Uuid) -> Self {
        Self::new(ActionType::Assignment, "user", user_id.to_string())
    }

    pub fn assign_team(team_id: Uuid) -> Self {
        Self::new(ActionType::Assignment, "team", team_id.to_string())
    }

    pub fn set_score(score: f64) -> Self {
        Self::new(ActionType::Scoring, "score", score)
    }

    pub fn change_status(status: &str) -> Self {
        Self::new(ActionType::StatusChange, "status", status)
    }

    pub fn notify(message: &str, recipients: &[&str]) -> Self {
        let mut action = Self::new(ActionType::Notification, "email", message);
        action.metadata.insert(
            "recipients".to_string(),
            serde_json::json!(recipients),
        );
        action
    }

    pub fn enrich(provider: &str) -> Self {
        Self::new(ActionType::Enrichment, provider, provider)
    }
}

/// Label of a rule, mirroring the action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Assignment,
    Scoring,
    Notification,
    StatusChange,
    Enrichment,
}

/// Domain events that can start automation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LeadCreated,
    LeadUpdated,
    LeadScored,
    LeadStatusChanged,
    Manual,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadCreated => "lead_created",
            Self::LeadUpdated => "lead_updated",
            Self::LeadScored => "lead_scored",
            Self::LeadStatusChanged => "lead_status_changed",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_lowercase()))
            .map_err(|_| format!("unknown event '{}'", s))
    }
}

/// A prioritized mapping from conditions to actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", alias = "rule_type")]
    pub rule_type: RuleType,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    /// 0-100, higher evaluated first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Events this rule is scoped to; empty means the type's default scope
    #[serde(default)]
    pub triggers: Vec<EventKind>,
    #[serde(default, alias = "createdById")]
    pub created_by_id: Option<Uuid>,
    #[serde(default = "chrono::Utc::now", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BusinessRule {
    pub fn new(name: &str, rule_type: RuleType, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            rule_type,
            is_active: true,
            priority,
            conditions: Vec::new(),
            actions: Vec::new(),
            triggers: Vec::new(),
            created_by_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn scoped_to(mut self, event: EventKind) -> Self {
        self.triggers.push(event);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// A rule without conditions matches every record.
    pub fn is_catch_all(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Event a workflow is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTrigger {
    LeadCreated,
    LeadScored,
    LeadStatusChanged,
    Manual,
}

impl WorkflowTrigger {
    pub fn as_str(&self) -> &'static str {
        self.event_kind().as_str()
    }

    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::LeadCreated => EventKind::LeadCreated,
            Self::LeadScored => EventKind::LeadScored,
            Self::LeadStatusChanged => EventKind::LeadStatusChanged,
            Self::Manual => EventKind::Manual,
        }
    }

    /// Workflow trigger for an event, if workflows can bind to it at all.
    pub fn for_event(event: EventKind) -> Option<Self> {
        match event {
            EventKind::LeadCreated => Some(Self::LeadCreated),
            EventKind::LeadScored => Some(Self::LeadScored),
            EventKind::LeadStatusChanged => Some(Self::LeadStatusChanged),
            EventKind::Manual => Some(Self::Manual),
            EventKind::LeadUpdated => None,
        }
    }
}

/// Kind of a workflow step; `config` shape depends on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepType {
    Action,
    Condition,
    Delay,
    Notification,
    Integration,
    Unsupported(String),
}

impl StepType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "action",
            Self::Condition => "condition",
            Self::Delay => "delay",
            Self::Notification => "notification",
            Self::Integration => "integration",
            Self::Unsupported(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StepType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "action" => Self::Action,
            "condition" => Self::Condition,
            "delay" => Self::Delay,
            "notification" => Self::Notification,
            "integration" => Self::Integration,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<StepType> for String {
    fn from(value: StepType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type", alias = "step_type")]
    pub step_type: StepType,
    pub name: String,
    /// 1-based position in the execution sequence
    pub order: i32,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl WorkflowStep {
    pub fn new(step_type: StepType, name: &str, order: i32, config: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_type,
            name: name.to_string(),
            order,
            config,
        }
    }
}

/// A named, prioritized sequence of typed steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger: WorkflowTrigger,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    #[serde(default, alias = "createdById")]
    pub created_by_id: Option<Uuid>,
    #[serde(default = "chrono::Utc::now", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn new(name: &str, trigger: WorkflowTrigger, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            trigger,
            is_active: true,
            priority,
            steps: Vec::new(),
            created_by_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Append a step at the next position.
    pub fn with_step(mut self, step_type: StepType, name: &str, config: serde_json::Value) -> Self {
        let order = self.steps.len() as i32 + 1;
        self.steps.push(WorkflowStep::new(step_type, name, order, config));
        self
    }

    /// Steps in ascending `order`.
    pub fn ordered_steps(&self) -> Vec<&WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.order);
        steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

/// What an operator sees in execution history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    InProgress,
    Succeeded,
    GateStopped,
    Failed,
    Cancelled,
}

/// One entry of the append-only step audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub step_type: StepType,
    pub order: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContextSnapshot {
    pub workflow_name: String,
    pub trigger: WorkflowTrigger,
    #[serde(default)]
    pub event: Option<EventKind>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionStateError {
    #[error("execution {id} is already {status}")]
    AlreadyFinalized { id: Uuid, status: ExecutionStatus },
    #[error("execution {id} is {status}, not running")]
    NotRunning { id: Uuid, status: ExecutionStatus },
    #[error("{0} is not a terminal status")]
    NotTerminal(ExecutionStatus),
}

/// Record of one invocation of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub trigger_data: serde_json::Value,
    pub execution_context: ExecutionContextSnapshot,
    pub step_results: Vec<StepResult>,
    /// Set when a condition step ended the run early
    #[serde(default)]
    pub gate_stopped: bool,
}

impl WorkflowExecution {
    /// Create the execution record in `running` state.
    pub fn start(
        workflow: &Workflow,
        lead_id: Option<Uuid>,
        event: Option<EventKind>,
        trigger_data: serde_json::Value,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow.id,
            lead_id,
            status: ExecutionStatus::Running,
            started_at: now,
            completed_at: None,
            error_message: None,
            trigger_data,
            execution_context: ExecutionContextSnapshot {
                workflow_name: workflow.name.clone(),
                trigger: workflow.trigger,
                event,
                timestamp: now,
                extra,
            },
            step_results: Vec::new(),
            gate_stopped: false,
        }
    }

    pub fn record_step(&mut self, result: StepResult) -> Result<(), ExecutionStateError> {
        if self.status != ExecutionStatus::Running {
            return Err(ExecutionStateError::NotRunning {
                id: self.id,
                status: self.status,
            });
        }
        self.step_results.push(result);
        Ok(())
    }

    /// Move to a terminal status. Allowed exactly once.
    pub fn finalize(
        &mut self,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<(), ExecutionStateError> {
        if !status.is_terminal() {
            return Err(ExecutionStateError::NotTerminal(status));
        }
        if self.status.is_terminal() {
            return Err(ExecutionStateError::AlreadyFinalized {
                id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.error_message = if status == ExecutionStatus::Failed {
            error_message
        } else {
            None
        };
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        match self.status {
            ExecutionStatus::Pending | ExecutionStatus::Running => ExecutionOutcome::InProgress,
            ExecutionStatus::Completed if self.gate_stopped => ExecutionOutcome::GateStopped,
            ExecutionStatus::Completed => ExecutionOutcome::Succeeded,
            ExecutionStatus::Failed => ExecutionOutcome::Failed,
            ExecutionStatus::Cancelled => ExecutionOutcome::Cancelled,
        }
    }
}
