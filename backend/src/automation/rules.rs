// Business Rule Matcher

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, warn};
use uuid::Uuid;

use leadgen_shared::{Action, BusinessRule};

use super::EmptyRulePolicy;
use super::conditions::{FieldSource, evaluate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Evaluate every rule
    #[default]
    All,
    /// Stop at the first matching rule
    Single,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub priority: i32,
    pub matched: bool,
    /// The rule's actions when it matched, empty otherwise
    pub actions: Vec<Action>,
    /// Matched only because the rule has no conditions
    #[serde(default)]
    pub catch_all: bool,
}

/// Active rules in evaluation order: priority descending, input order on ties.
pub fn order_rules(rules: &[BusinessRule]) -> Vec<&BusinessRule> {
    let mut active: Vec<&BusinessRule> = rules.iter().filter(|rule| rule.is_active).collect();
    // sort_by_key is stable
    active.sort_by_key(|rule| Reverse(rule.priority));
    active
}

pub fn match_rule(rule: &BusinessRule, source: &impl FieldSource, policy: EmptyRulePolicy) -> MatchResult {
    let catch_all = rule.is_catch_all();

    let matched = if !rule.is_active {
        false
    } else if catch_all {
        match policy {
            EmptyRulePolicy::MatchAll => {
                warn!("Rule '{}' ({}) has no conditions and matches every record", rule.name, rule.id);
                true
            }
            EmptyRulePolicy::Inert => {
                debug!("Rule '{}' has no conditions, treated as inert", rule.name);
                false
            }
        }
    } else {
        evaluate(&rule.conditions, source)
    };

    debug!("Rule '{}' (priority {}) matched: {}", rule.name, rule.priority, matched);

    MatchResult {
        rule_id: rule.id,
        rule_name: rule.name.clone(),
        priority: rule.priority,
        matched,
        actions: if matched { rule.actions.clone() } else { Vec::new() },
        catch_all: matched && catch_all,
    }
}

/// Evaluate `rules` against one record.
///
/// Inactive rules are dropped here as well, so passing a pre-filtered set is
/// harmless. Results come back in evaluation order, which is also the order
/// their actions must be applied in: a lower priority rule writing the same
/// attribute later overwrites a higher priority one.
pub fn match_rules(
    rules: &[BusinessRule],
    source: &impl FieldSource,
    policy: EmptyRulePolicy,
    mode: MatchMode,
) -> Vec<MatchResult> {
    let mut results = Vec::new();

    for rule in order_rules(rules) {
        let result = match_rule(rule, source, policy);
        let stop = result.matched && mode == MatchMode::Single;
        results.push(result);
        if stop {
            break;
        }
    }

    results
}

/// Rules the product ships as starting points
pub mod presets {
    use super::*;
    use crate::automation::conditions::presets as when;
    use leadgen_shared::{LeadStatus, RuleType};

    pub fn qualify_hot_leads(threshold: f64) -> BusinessRule {
        BusinessRule::new("Qualify hot leads", RuleType::StatusChange, 80)
            .with_condition(when::score_above(threshold))
            .with_condition(when::status_is(LeadStatus::Raw))
            .with_action(Action::change_status(LeadStatus::Qualified.as_str()))
    }

    pub fn route_industry(industries: &[&str], team_id: Uuid) -> BusinessRule {
        BusinessRule::new("Route by industry", RuleType::Assignment, 50)
            .with_condition(when::industry_in(industries))
            .with_action(Action::assign_team(team_id))
    }
}
