use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod automation;

pub use automation::*;

/// Loosely typed value carried by conditions, actions and record lookups.
///
/// Comparison semantics depend on the operator using the value, never on a
/// fixed declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Numeric coercion used by ordering operators and scoring.
    ///
    /// Numbers and numeric strings coerce; booleans, lists and non-finite
    /// results do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Type-aware equality: values of different variants are never equal.
    pub fn strict_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.strict_eq(y))
            }
            _ => false,
        }
    }

    /// Stringified form used by `contains` and template rendering.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(|item| item.to_display_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Convert a JSON value. `null` and objects have no `FieldValue` form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(items) => Some(Self::List(
                items.iter().filter_map(Self::from_json).collect(),
            )),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::List(value)
    }
}

/// Lifecycle status of a lead
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    Raw,
    Enriched,
    Contacted,
    Qualified,
    Nurturing,
    Converted,
    Disqualified,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 8] = [
        LeadStatus::Raw,
        LeadStatus::Enriched,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Nurturing,
        LeadStatus::Converted,
        LeadStatus::Disqualified,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Enriched => "ENRICHED",
            Self::Contacted => "CONTACTED",
            Self::Qualified => "QUALIFIED",
            Self::Nurturing => "NURTURING",
            Self::Converted => "CONVERTED",
            Self::Disqualified => "DISQUALIFIED",
            Self::Lost => "LOST",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid lead status")]
pub struct InvalidLeadStatus(pub String);

impl FromStr for LeadStatus {
    type Err = InvalidLeadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InvalidLeadStatus(s.to_string()))
    }
}

/// The business record automation reads from and writes to.
///
/// Synthetic records submitted for previews may omit any attribute; missing
/// attributes take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(alias = "companyName")]
    pub company_name: Option<String>,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub score: i32,
    pub status: LeadStatus,
    #[serde(alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,
    #[serde(alias = "assignedTeam")]
    pub assigned_team: Option<Uuid>,
    #[serde(alias = "campaignId")]
    pub campaign_id: Option<Uuid>,
    /// Custom attributes not modelled as columns
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for LeadRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: String::new(),
            first_name: None,
            last_name: None,
            company_name: None,
            domain: None,
            industry: None,
            score: 0,
            status: LeadStatus::Raw,
            assigned_to: None,
            assigned_team: None,
            campaign_id: None,
            attributes: serde_json::Map::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Collapse naming styles so `assignedTo`, `assigned_to` and `company.name`
/// resolve to the same attribute.
fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '.' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl LeadRecord {
    /// Look up an attribute by name. Unknown and null attributes are absent.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        let id = |value: &Option<Uuid>| value.map(|v| FieldValue::Text(v.to_string()));

        match normalize_field_name(name).as_str() {
            "id" | "leadid" => Some(FieldValue::Text(self.id.to_string())),
            "email" => Some(FieldValue::Text(self.email.clone())),
            "firstname" => text(&self.first_name),
            "lastname" => text(&self.last_name),
            "company" | "companyname" => text(&self.company_name),
            "domain" | "companydomain" => text(&self.domain),
            "industry" => text(&self.industry),
            "score" => Some(FieldValue::Number(self.score as f64)),
            "status" => Some(FieldValue::Text(self.status.as_str().to_string())),
            "assignedto" | "assigneduser" => id(&self.assigned_to),
            "assignedteam" | "team" => id(&self.assigned_team),
            "campaignid" | "campaign" => id(&self.campaign_id),
            _ => self.custom_attribute(name),
        }
    }

    fn custom_attribute(&self, name: &str) -> Option<FieldValue> {
        if let Some(value) = self.attributes.get(name) {
            return FieldValue::from_json(value);
        }

        let mut parts = name.split('.');
        let mut current = self.attributes.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        FieldValue::from_json(current)
    }

    /// JSON view used for template rendering and execution snapshots.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Attribute writes requested by automation. `None` leaves the attribute alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_team: Option<Uuid>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.score.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.assigned_team.is_none()
    }

    /// Fold a later patch over this one; later writes win.
    pub fn merge(&mut self, later: LeadPatch) {
        if later.score.is_some() {
            self.score = later.score;
        }
        if later.status.is_some() {
            self.status = later.status;
        }
        if later.assigned_to.is_some() {
            self.assigned_to = later.assigned_to;
        }
        if later.assigned_team.is_some() {
            self.assigned_team = later.assigned_team;
        }
    }

    pub fn apply_to(&self, lead: &mut LeadRecord) {
        if self.is_empty() {
            return;
        }
        if let Some(score) = self.score {
            lead.score = score;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(user) = self.assigned_to {
            lead.assigned_to = Some(user);
        }
        if let Some(team) = self.assigned_team {
            lead.assigned_team = Some(team);
        }
        lead.updated_at = Some(Utc::now());
    }
}
