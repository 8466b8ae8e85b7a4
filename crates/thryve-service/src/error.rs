//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use thryve_store::StoreError;

use crate::agent::AgentError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found, or owned by someone else.
    #[error("{0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("{0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("Insufficient credits")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// An agent call failed or answered without the expected field.
    #[error("External agent error")]
    Agent {
        /// Upstream body or failure description.
        details: serde_json::Value,
    },

    /// A payment provider call failed.
    #[error("{0}")]
    ExternalService(String),

    /// A required integration is not configured.
    #[error("{0}")]
    NotConfigured(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// Status code and stable error code for this error.
    #[must_use]
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::InsufficientCredits { .. } => {
                (StatusCode::PAYMENT_REQUIRED, "insufficient_credits")
            }
            Self::Agent { .. } => (StatusCode::BAD_GATEWAY, "agent_error"),
            Self::ExternalService(_) => (StatusCode::BAD_GATEWAY, "external_service_error"),
            Self::NotConfigured(_) => (StatusCode::INTERNAL_SERVER_ERROR, "not_configured"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let (message, details) = match self {
            Self::InsufficientCredits { balance, required } => (
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::Agent { details } => ("External agent error".to_string(), Some(details)),
            Self::NotConfigured(ref msg) => {
                tracing::error!(error = %msg, "Integration not configured");
                (msg.clone(), None)
            }
            Self::Internal(ref msg) => {
                tracing::error!(error = %msg, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            error: message,
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::Conflict { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::DuplicateReference { reference } => {
                Self::Conflict(format!("reference already applied: {reference}"))
            }
            StoreError::BalanceOverflow { .. } => {
                Self::BadRequest("amount would overflow the balance".into())
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        tracing::warn!(error = %err, "Agent call failed");
        match err {
            AgentError::Status { body, .. } | AgentError::MissingField { body, .. } => {
                Self::Agent { details: body }
            }
            AgentError::Timeout => Self::Agent {
                details: serde_json::json!({ "message": "agent call timed out" }),
            },
            AgentError::Http(e) => Self::Agent {
                details: serde_json::json!({ "message": e.to_string() }),
            },
            AgentError::NotConfigured(agent) => {
                Self::NotConfigured(format!("{agent} agent is not configured"))
            }
        }
    }
}
