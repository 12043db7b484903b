// Lead Automation Core
//
// Business rules (conditions -> actions) and workflows (ordered typed steps)
// evaluated against a lead when a domain event arrives.

pub mod actions;
pub mod collaborators;
pub mod conditions;
pub mod dry_run;
pub mod engine;
pub mod executor;
pub mod rules;
pub mod templates;
pub mod triggers;
pub mod validation;

pub use actions::{ActionApplier, ActionOutcome, AppliedActions};
pub use collaborators::{
    EnrichmentRequest, EnrichmentRequester, ExecutionStore, IntegrationInvoker, LeadRepository,
    Notification, NotificationSender, RuleFilter, RuleRepository, SideEffects, WorkflowRepository,
};
pub use conditions::{FieldSource, RecordView, evaluate};
pub use dry_run::{DryRun, RecordedIntents};
pub use engine::{AutomationEngine, AutomationKind, ExecutionSummary, RuleTestReport, WorkflowPreview};
pub use executor::{RunReport, StepRunner};
pub use rules::{MatchMode, MatchResult, match_rule, match_rules};
pub use triggers::DomainEvent;
pub use validation::{validate_rule, validate_workflow};

/// What a rule with no conditions does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyRulePolicy {
    /// Vacuous match: the rule fires for every record
    #[default]
    MatchAll,
    /// The rule never fires until it has at least one condition
    Inert,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions {
    /// Keep running after a failed `action` step instead of halting
    pub continue_on_step_failure: bool,
    pub empty_rule_policy: EmptyRulePolicy,
    /// Recipients for notifications that carry none of their own
    pub default_recipients: Vec<String>,
}
