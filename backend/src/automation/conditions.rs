// Condition Evaluator - flat condition chains against a record

use leadgen_shared::{Condition, ConditionOperator, FieldValue, LeadRecord};
use tracing::debug;

/// Anything conditions can read named attributes from
pub trait FieldSource {
    /// `None` means the attribute is absent.
    fn lookup(&self, field: &str) -> Option<FieldValue>;
}

impl FieldSource for LeadRecord {
    fn lookup(&self, field: &str) -> Option<FieldValue> {
        self.field(field)
    }
}

impl FieldSource for serde_json::Value {
    fn lookup(&self, field: &str) -> Option<FieldValue> {
        json_path(self, field).and_then(FieldValue::from_json)
    }
}

/// A lead (when there is one) backed by the trigger payload.
///
/// Lead attributes win; anything the lead does not carry is looked up in
/// the payload by dot path.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub lead: Option<&'a LeadRecord>,
    pub payload: &'a serde_json::Value,
}

impl FieldSource for RecordView<'_> {
    fn lookup(&self, field: &str) -> Option<FieldValue> {
        self.lead
            .and_then(|lead| lead.field(field))
            .or_else(|| self.payload.lookup(field))
    }
}

/// Walk a dot-separated path through nested JSON objects.
pub(crate) fn json_path<'a>(json: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if let Some(direct) = json.get(path) {
        return Some(direct);
    }
    path.split('.').try_fold(json, |current, part| current.get(part))
}

/// Evaluate a condition chain left to right.
///
/// The connective attached to condition *i* joins the accumulated result of
/// conditions `1..=i` with condition *i + 1*. There is no precedence, so
/// `A OR B AND C` is `(A OR B) AND C`. An empty chain is vacuously true.
pub fn evaluate(conditions: &[Condition], source: &impl FieldSource) -> bool {
    let mut chain = conditions.iter();
    let Some(first) = chain.next() else {
        return true;
    };

    let mut accumulated = evaluate_condition(first, source);
    let mut connective = first.logical_operator;

    for condition in chain {
        let result = evaluate_condition(condition, source);
        accumulated = connective.combine(accumulated, result);
        connective = condition.logical_operator;
    }

    accumulated
}

/// Individual result of every condition, in input order.
pub fn evaluate_each(conditions: &[Condition], source: &impl FieldSource) -> Vec<bool> {
    conditions
        .iter()
        .map(|condition| evaluate_condition(condition, source))
        .collect()
}

pub fn evaluate_condition(condition: &Condition, source: &impl FieldSource) -> bool {
    let actual = source.lookup(&condition.field);
    compare(&condition.operator, actual.as_ref(), condition.value.as_ref())
}

/// Apply one operator. Malformed input degrades to `false`, never an error.
pub fn compare(
    operator: &ConditionOperator,
    actual: Option<&FieldValue>,
    expected: Option<&FieldValue>,
) -> bool {
    let Some(expected) = expected else {
        debug!("Condition with operator '{}' has no value", operator.as_str());
        return false;
    };

    // Membership needs a list before anything else is considered, so a
    // malformed `not_in` cannot pass vacuously.
    if matches!(operator, ConditionOperator::In | ConditionOperator::NotIn)
        && expected.as_list().is_none()
    {
        debug!("'{}' condition value is not a list", operator.as_str());
        return false;
    }

    let Some(actual) = actual else {
        return matches!(operator, ConditionOperator::NotEquals | ConditionOperator::NotIn);
    };

    match operator {
        ConditionOperator::Equals => actual.strict_eq(expected),
        ConditionOperator::NotEquals => !actual.strict_eq(expected),
        ConditionOperator::GreaterThan => match (actual.as_number(), expected.as_number()) {
            (Some(a), Some(e)) => a > e,
            _ => false,
        },
        ConditionOperator::LessThan => match (actual.as_number(), expected.as_number()) {
            (Some(a), Some(e)) => a < e,
            _ => false,
        },
        ConditionOperator::Contains => actual
            .to_display_string()
            .contains(&expected.to_display_string()),
        ConditionOperator::In => expected
            .as_list()
            .is_some_and(|items| items.iter().any(|item| actual.strict_eq(item))),
        ConditionOperator::NotIn => expected
            .as_list()
            .is_some_and(|items| !items.iter().any(|item| actual.strict_eq(item))),
        ConditionOperator::Unsupported(raw) => {
            debug!("Unsupported condition operator '{}'", raw);
            false
        }
    }
}

/// Common lead conditions
pub mod presets {
    use super::*;

    pub fn score_above(threshold: f64) -> Condition {
        Condition::greater_than("score", threshold)
    }

    pub fn score_below(threshold: f64) -> Condition {
        Condition::less_than("score", threshold)
    }

    pub fn status_is(status: leadgen_shared::LeadStatus) -> Condition {
        Condition::equals("status", status.as_str())
    }

    pub fn industry_in(industries: &[&str]) -> Condition {
        Condition::in_list(
            "industry",
            industries.iter().map(|i| FieldValue::from(*i)).collect(),
        )
    }

    pub fn domain_contains(fragment: &str) -> Condition {
        Condition::contains("domain", fragment)
    }
}
