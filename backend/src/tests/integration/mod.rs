mod api_events;
mod api_health;
mod api_rules;
mod api_workflows;
