//! Error types for the automation core and the HTTP surface
//!
//! `AutomationError` is what the engine and its collaborators return.
//! `AppError` is what handlers return; it renders a consistent JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use leadgen_shared::ExecutionStateError;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("Rule {0} not found")]
    RuleNotFound(Uuid),
    #[error("Workflow {0} not found")]
    WorkflowNotFound(Uuid),
    #[error("Lead {0} not found")]
    LeadNotFound(Uuid),
    #[error("Execution {0} not found")]
    ExecutionNotFound(Uuid),
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
    #[error(transparent)]
    ExecutionState(#[from] ExecutionStateError),
    #[error("Notification failed: {0}")]
    Notification(String),
    #[error("Integration '{integration}' failed: {message}")]
    Integration { integration: String, message: String },
    #[error("Enrichment request failed: {0}")]
    Enrichment(String),
}

impl From<sqlx::Error> for AutomationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.to_string())
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Repository(format!("stored definition could not be decoded: {}", err))
    }
}

pub type AutomationResult<T> = Result<T, AutomationError>;

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub code: String,
    pub message: String,
    /// Field-level errors for validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    pub timestamp: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> AppError {
        AppError::NotFound(message.into())
    }
}

/// Application error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    ValidationError { details: HashMap<String, Vec<String>> },
    BadRequest(String),
    InternalError(String),
    DatabaseError(String),
    ExternalServiceError { service: String, message: String },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InternalError(_) | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalServiceError { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotFound(resource) => format!("{} not found", resource),
            Self::ValidationError { .. } => "Validation failed".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
            Self::ExternalServiceError { service, message } => {
                tracing::error!("External service error ({}): {}", service, message);
                format!("External service '{}' is unavailable", service)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = ApiError::new(self.error_code(), self.message());

        if let Self::ValidationError { details } = &self {
            error.details = Some(details.clone());
        }

        (status, Json(error)).into_response()
    }
}

impl From<AutomationError> for AppError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::RuleNotFound(id) => Self::NotFound(format!("Rule {}", id)),
            AutomationError::WorkflowNotFound(id) => Self::NotFound(format!("Workflow {}", id)),
            AutomationError::LeadNotFound(id) => Self::NotFound(format!("Lead {}", id)),
            AutomationError::ExecutionNotFound(id) => Self::NotFound(format!("Execution {}", id)),
            AutomationError::InvalidDefinition(msg) => Self::BadRequest(msg),
            AutomationError::Repository(msg) => Self::DatabaseError(msg),
            AutomationError::ExecutionState(e) => Self::InternalError(e.to_string()),
            AutomationError::Notification(msg) => Self::ExternalServiceError {
                service: "notification".to_string(),
                message: msg,
            },
            AutomationError::Integration { integration, message } => Self::ExternalServiceError {
                service: integration,
                message,
            },
            AutomationError::Enrichment(msg) => Self::ExternalServiceError {
                service: "enrichment".to_string(),
                message: msg,
            },
        }
    }
}

pub type ApiResult<T> = Result<T, AppError>;

/// Collects field-level validation errors
pub struct ValidationBuilder {
    details: HashMap<String, Vec<String>>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self {
            details: HashMap::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.push(field, message);
        self
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.details
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn build(self) -> Option<AppError> {
        if self.details.is_empty() {
            None
        } else {
            Some(AppError::ValidationError {
                details: self.details,
            })
        }
    }
}

impl Default for ValidationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
