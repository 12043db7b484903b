// `{{field}}` placeholders in notification text and integration payloads

use regex::Regex;
use std::sync::LazyLock;

use super::conditions::{RecordView, json_path};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is valid"));

/// Lead attributes first, then the trigger payload by dot path.
fn resolve(view: &RecordView<'_>, path: &str) -> Option<String> {
    if let Some(value) = view.lead.and_then(|lead| lead.field(path)) {
        return Some(value.to_display_string());
    }

    json_path(view.payload, path).and_then(|value| match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

/// Replace every resolvable placeholder; unresolvable ones stay verbatim.
pub fn render(template: &str, view: &RecordView<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            resolve(view, &caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Render every string inside a JSON document.
pub fn render_json(value: &serde_json::Value, view: &RecordView<'_>) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(render(s, view)),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_json(v, view)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(|v| render_json(v, view)).collect())
        }
        other => other.clone(),
    }
}
