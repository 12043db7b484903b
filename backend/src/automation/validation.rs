// Authoring checks for rules and workflows

use leadgen_shared::{ActionType, BusinessRule, ConditionOperator, FieldValue, LeadStatus, Workflow};
use uuid::Uuid;

use super::executor::parse_step_config;
use crate::error::{AppError, ValidationBuilder};

const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 0..=100;

fn check_name(validation: &mut ValidationBuilder, name: &str) {
    if name.trim().is_empty() {
        validation.push("name", "Name is required");
    }
}

fn check_priority(validation: &mut ValidationBuilder, priority: i32) {
    if !PRIORITY_RANGE.contains(&priority) {
        validation.push("priority", "Priority must be between 0 and 100");
    }
}

/// Validate a rule before it is stored. Returns warnings on success.
pub fn validate_rule(rule: &BusinessRule) -> Result<Vec<String>, AppError> {
    let mut validation = ValidationBuilder::new();
    let mut warnings = Vec::new();

    check_name(&mut validation, &rule.name);
    check_priority(&mut validation, rule.priority);

    for (i, condition) in rule.conditions.iter().enumerate() {
        if condition.field.trim().is_empty() {
            validation.push(&format!("conditions[{}].field", i), "Field is required");
        }
        if let ConditionOperator::Unsupported(raw) = &condition.operator {
            validation.push(
                &format!("conditions[{}].operator", i),
                &format!("Unknown operator '{}'", raw),
            );
        }
        match &condition.value {
            None => validation.push(&format!("conditions[{}].value", i), "Value is required"),
            Some(value)
                if matches!(condition.operator, ConditionOperator::In | ConditionOperator::NotIn)
                    && value.as_list().is_none() =>
            {
                validation.push(
                    &format!("conditions[{}].value", i),
                    "Membership operators need a list value",
                );
            }
            Some(_) => {}
        }
    }

    if rule.actions.is_empty() {
        warnings.push("Rule has no actions and will never change anything".to_string());
    }

    for (i, action) in rule.actions.iter().enumerate() {
        let field = format!("actions[{}].value", i);
        let text = action.value.as_ref().map(FieldValue::to_display_string);

        match &action.action_type {
            ActionType::Unsupported(raw) => validation.push(
                &format!("actions[{}].type", i),
                &format!("Unknown action type '{}'", raw),
            ),
            ActionType::StatusChange => {
                if let Err(e) = text.unwrap_or_default().parse::<LeadStatus>() {
                    validation.push(&field, &e.to_string());
                }
            }
            ActionType::Scoring => match action.value.as_ref().and_then(FieldValue::as_number) {
                None => validation.push(&field, "Score must be numeric"),
                Some(score) if !(0.0..=100.0).contains(&score) => warnings.push(format!(
                    "Action {} sets score {} which will be clamped to 0-100",
                    i + 1,
                    score
                )),
                Some(_) => {}
            },
            ActionType::Assignment => {
                if Uuid::parse_str(text.unwrap_or_default().trim()).is_err() {
                    validation.push(&field, "Assignee must be a user or team id");
                }
            }
            ActionType::Notification => {
                if text.unwrap_or_default().trim().is_empty() {
                    validation.push(&field, "Notification message is required");
                }
            }
            ActionType::Enrichment => {}
        }
    }

    if let Some(error) = validation.build() {
        return Err(error);
    }

    if rule.is_catch_all() {
        warnings.push(
            "Catch-all rule: no conditions, its actions run for every lead it is dispatched against"
                .to_string(),
        );
    }

    Ok(warnings)
}

/// Validate a workflow before it is stored. Returns warnings on success.
pub fn validate_workflow(workflow: &Workflow) -> Result<Vec<String>, AppError> {
    let mut validation = ValidationBuilder::new();
    let mut warnings = Vec::new();

    check_name(&mut validation, &workflow.name);
    check_priority(&mut validation, workflow.priority);

    let mut orders: Vec<i32> = workflow.steps.iter().map(|step| step.order).collect();
    orders.sort_unstable();
    let expected: Vec<i32> = (1..=workflow.steps.len() as i32).collect();
    if orders != expected {
        validation.push(
            "steps",
            &format!("Step order must be exactly 1..={} without gaps or duplicates", workflow.steps.len()),
        );
    }

    for (i, step) in workflow.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            validation.push(&format!("steps[{}].name", i), "Step name is required");
        }
        if let Err(message) = parse_step_config(step) {
            validation.push(&format!("steps[{}].config", i), &message);
        }
    }

    if let Some(error) = validation.build() {
        return Err(error);
    }

    if workflow.steps.is_empty() {
        warnings.push("Workflow has no steps".to_string());
    }

    Ok(warnings)
}
