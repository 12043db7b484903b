use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use leadgen_shared::{
    Action, BusinessRule, Condition, EventKind, ExecutionContextSnapshot, LeadPatch, LeadRecord,
    StepResult, Workflow, WorkflowExecution, WorkflowStep, WorkflowTrigger,
};

use crate::automation::{ExecutionStore, LeadRepository, RuleFilter, RuleRepository, WorkflowRepository};
use crate::error::{AutomationError, AutomationResult};

/// Text column form of a serde enum, e.g. `RuleType::StatusChange` -> `status_change`
fn enum_text<T: Serialize>(value: &T) -> AutomationResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(text) => Ok(text),
        other => Err(AutomationError::Repository(format!("cannot store {} as text", other))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> AutomationResult<T> {
    Ok(serde_json::from_value(serde_json::Value::String(text))?)
}

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    company_name: Option<String>,
    domain: Option<String>,
    industry: Option<String>,
    score: i32,
    status: String,
    assigned_to: Option<Uuid>,
    assigned_team: Option<Uuid>,
    campaign_id: Option<Uuid>,
    attributes: Json<serde_json::Map<String, serde_json::Value>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeadRow> for LeadRecord {
    type Error = AutomationError;

    fn try_from(row: LeadRow) -> AutomationResult<Self> {
        Ok(Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            company_name: row.company_name,
            domain: row.domain,
            industry: row.industry,
            score: row.score,
            status: row
                .status
                .parse()
                .map_err(|e: leadgen_shared::InvalidLeadStatus| AutomationError::Repository(e.to_string()))?,
            assigned_to: row.assigned_to,
            assigned_team: row.assigned_team,
            campaign_id: row.campaign_id,
            attributes: row.attributes.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RuleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    rule_type: String,
    is_active: bool,
    priority: i32,
    conditions: Json<Vec<Condition>>,
    actions: Json<Vec<Action>>,
    triggers: Json<Vec<EventKind>>,
    created_by_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<RuleRow> for BusinessRule {
    type Error = AutomationError;

    fn try_from(row: RuleRow) -> AutomationResult<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            rule_type: enum_from_text(row.rule_type)?,
            is_active: row.is_active,
            priority: row.priority,
            conditions: row.conditions.0,
            actions: row.actions.0,
            triggers: row.triggers.0,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WorkflowRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    trigger_event: String,
    is_active: bool,
    priority: i32,
    steps: Json<Vec<WorkflowStep>>,
    created_by_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<WorkflowRow> for Workflow {
    type Error = AutomationError;

    fn try_from(row: WorkflowRow) -> AutomationResult<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            trigger: enum_from_text(row.trigger_event)?,
            is_active: row.is_active,
            priority: row.priority,
            steps: row.steps.0,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExecutionRow {
    id: Uuid,
    workflow_id: Uuid,
    lead_id: Option<Uuid>,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    trigger_data: serde_json::Value,
    execution_context: Json<ExecutionContextSnapshot>,
    step_results: Json<Vec<StepResult>>,
    gate_stopped: bool,
}

impl TryFrom<ExecutionRow> for WorkflowExecution {
    type Error = AutomationError;

    fn try_from(row: ExecutionRow) -> AutomationResult<Self> {
        Ok(Self {
            id: row.id,
            workflow_id: row.workflow_id,
            lead_id: row.lead_id,
            status: row.status.parse().map_err(AutomationError::Repository)?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            trigger_data: row.trigger_data,
            execution_context: row.execution_context.0,
            step_results: row.step_results.0,
            gate_stopped: row.gate_stopped,
        })
    }
}

const LEAD_COLUMNS: &str = "id, email, first_name, last_name, company_name, domain, industry, score, status, \
     assigned_to, assigned_team, campaign_id, attributes, created_at, updated_at";
const RULE_COLUMNS: &str = "id, name, description, rule_type, is_active, priority, conditions, actions, \
     triggers, created_by_id, created_at, updated_at";
const WORKFLOW_COLUMNS: &str =
    "id, name, description, trigger_event, is_active, priority, steps, created_by_id, created_at, updated_at";
const EXECUTION_COLUMNS: &str = "id, workflow_id, lead_id, status, started_at, completed_at, error_message, \
     trigger_data, execution_context, step_results, gate_stopped";

/// Postgres-backed implementation of every repository
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PgStore {
    async fn list_active_rules(&self, filter: &RuleFilter) -> AutomationResult<Vec<BusinessRule>> {
        let rule_type = filter.rule_type.as_ref().map(enum_text).transpose()?;
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM business_rules \
             WHERE is_active AND ($1::text IS NULL OR rule_type = $1) \
             ORDER BY priority DESC, created_at",
            RULE_COLUMNS
        ))
        .bind(rule_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BusinessRule::try_from).collect()
    }

    async fn get_rule(&self, id: Uuid) -> AutomationResult<Option<BusinessRule>> {
        sqlx::query_as::<_, RuleRow>(&format!("SELECT {} FROM business_rules WHERE id = $1", RULE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BusinessRule::try_from)
            .transpose()
    }

    async fn save_rule(&self, rule: &BusinessRule) -> AutomationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO business_rules
                (id, name, description, rule_type, is_active, priority, conditions, actions, triggers, created_by_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = $2, description = $3, rule_type = $4, is_active = $5, priority = $6,
                conditions = $7, actions = $8, triggers = $9, updated_at = NOW()
            "#,
        )
        .bind(rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(enum_text(&rule.rule_type)?)
        .bind(rule.is_active)
        .bind(rule.priority)
        .bind(Json(&rule.conditions))
        .bind(Json(&rule.actions))
        .bind(Json(&rule.triggers))
        .bind(rule.created_by_id)
        .bind(rule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_rule(&self, id: Uuid) -> AutomationResult<bool> {
        let result = sqlx::query("DELETE FROM business_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WorkflowRepository for PgStore {
    async fn list_active_workflows(&self, trigger: WorkflowTrigger) -> AutomationResult<Vec<Workflow>> {
        let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {} FROM workflows WHERE is_active AND trigger_event = $1 ORDER BY priority DESC, created_at",
            WORKFLOW_COLUMNS
        ))
        .bind(trigger.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Workflow::try_from).collect()
    }

    async fn get_workflow(&self, id: Uuid) -> AutomationResult<Option<Workflow>> {
        sqlx::query_as::<_, WorkflowRow>(&format!("SELECT {} FROM workflows WHERE id = $1", WORKFLOW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Workflow::try_from)
            .transpose()
    }

    async fn save_workflow(&self, workflow: &Workflow) -> AutomationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflows
                (id, name, description, trigger_event, is_active, priority, steps, created_by_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = $2, description = $3, trigger_event = $4, is_active = $5, priority = $6,
                steps = $7, updated_at = NOW()
            "#,
        )
        .bind(workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(workflow.trigger.as_str())
        .bind(workflow.is_active)
        .bind(workflow.priority)
        .bind(Json(&workflow.steps))
        .bind(workflow.created_by_id)
        .bind(workflow.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LeadRepository for PgStore {
    async fn get_lead(&self, id: Uuid) -> AutomationResult<Option<LeadRecord>> {
        sqlx::query_as::<_, LeadRow>(&format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeadRecord::try_from)
            .transpose()
    }

    async fn apply_patch(&self, id: Uuid, patch: &LeadPatch) -> AutomationResult<LeadRecord> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads SET \
                score = COALESCE($2, score), \
                status = COALESCE($3, status), \
                assigned_to = COALESCE($4, assigned_to), \
                assigned_team = COALESCE($5, assigned_team), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(patch.score)
        .bind(patch.status.map(|status| status.as_str()))
        .bind(patch.assigned_to)
        .bind(patch.assigned_team)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AutomationError::LeadNotFound(id))?;

        LeadRecord::try_from(row)
    }

    async fn save_lead(&self, lead: &LeadRecord) -> AutomationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leads
                (id, email, first_name, last_name, company_name, domain, industry, score, status,
                 assigned_to, assigned_team, campaign_id, attributes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                email = $2, first_name = $3, last_name = $4, company_name = $5, domain = $6,
                industry = $7, score = $8, status = $9, assigned_to = $10, assigned_team = $11,
                campaign_id = $12, attributes = $13, updated_at = NOW()
            "#,
        )
        .bind(lead.id)
        .bind(&lead.email)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.company_name)
        .bind(&lead.domain)
        .bind(&lead.industry)
        .bind(lead.score)
        .bind(lead.status.as_str())
        .bind(lead.assigned_to)
        .bind(lead.assigned_team)
        .bind(lead.campaign_id)
        .bind(Json(&lead.attributes))
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for PgStore {
    async fn create_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_executions
                (id, workflow_id, lead_id, status, started_at, completed_at, error_message,
                 trigger_data, execution_context, step_results, gate_stopped)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(execution.id)
        .bind(execution.workflow_id)
        .bind(execution.lead_id)
        .bind(execution.status.as_str())
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(&execution.error_message)
        .bind(&execution.trigger_data)
        .bind(Json(&execution.execution_context))
        .bind(Json(&execution.step_results))
        .bind(execution.gate_stopped)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> AutomationResult<()> {
        // Terminal rows are never rewritten
        let result = sqlx::query(
            r#"
            UPDATE workflow_executions
            SET status = $2, completed_at = $3, error_message = $4, step_results = $5, gate_stopped = $6
            WHERE id = $1 AND status IN ('pending', 'running')
            "#,
        )
        .bind(execution.id)
        .bind(execution.status.as_str())
        .bind(execution.completed_at)
        .bind(&execution.error_message)
        .bind(Json(&execution.step_results))
        .bind(execution.gate_stopped)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AutomationError::ExecutionNotFound(execution.id));
        }
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> AutomationResult<Option<WorkflowExecution>> {
        sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM workflow_executions WHERE id = $1",
            EXECUTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(WorkflowExecution::try_from)
        .transpose()
    }

    async fn list_executions(&self, workflow_id: Uuid, limit: i64) -> AutomationResult<Vec<WorkflowExecution>> {
        let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {} FROM workflow_executions WHERE workflow_id = $1 ORDER BY started_at DESC LIMIT $2",
            EXECUTION_COLUMNS
        ))
        .bind(workflow_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkflowExecution::try_from).collect()
    }

    async fn fail_stale_executions(&self, cutoff: DateTime<Utc>, message: &str) -> AutomationResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_executions
            SET status = 'failed', error_message = $2, completed_at = NOW()
            WHERE status = 'running' AND started_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
