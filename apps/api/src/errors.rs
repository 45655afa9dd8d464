use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rate limit or overload that outlasted every retry.
    #[error("AI service is temporarily unavailable: {0}")]
    TransientService(String),

    #[error("AI response was malformed: {0}")]
    SchemaValidation(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    /// Action attempted in the wrong state or without its prerequisite entity.
    #[error("Workflow state error: {0}")]
    WorkflowState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("AI service error: {0}")]
    Service(LlmError),

    #[error("AI service did not answer in time")]
    Timeout,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Service(LlmError::Timeout) | ExtractionError::Timeout(_) => {
                AppError::Timeout
            }
            ExtractionError::Service(e) if e.is_transient() => {
                AppError::TransientService(e.to_string())
            }
            ExtractionError::Service(e) => AppError::Service(e),
            ExtractionError::Schema(msg) => AppError::SchemaValidation(msg),
        }
    }
}

impl AppError {
    /// True when the service rejected our credentials.
    pub fn is_credentials_problem(&self) -> bool {
        matches!(self, AppError::Service(LlmError::Unauthorized { .. }))
    }

    /// Short message safe to show a user. Raw detail is logged, not displayed.
    pub fn user_message(&self) -> String {
        match self {
            AppError::TransientService(_) => {
                "The AI service is busy right now. Please try again in a moment.".to_string()
            }
            AppError::SchemaValidation(_) => {
                "The AI returned an incomplete answer. Please try again.".to_string()
            }
            AppError::Timeout => "The AI service took too long to respond.".to_string(),
            AppError::Service(LlmError::Unauthorized { .. }) => {
                "The AI service rejected the configured credentials.".to_string()
            }
            AppError::Service(_) => "An AI processing error occurred.".to_string(),
            AppError::Internal(_) => "An internal error occurred.".to_string(),
            AppError::UploadTooLarge { limit } => format!(
                "Resume file is too large. Please upload a file under {} MB.",
                limit.div_ceil(1024 * 1024)
            ),
            AppError::UnsupportedInput(msg)
            | AppError::WorkflowState(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::TransientService(msg) => {
                tracing::warn!("Transient service error: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT_SERVICE_ERROR")
            }
            AppError::SchemaValidation(msg) => {
                tracing::error!("Schema validation error: {msg}");
                (StatusCode::BAD_GATEWAY, "SCHEMA_VALIDATION_ERROR")
            }
            AppError::UnsupportedInput(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_INPUT")
            }
            AppError::UploadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "UPLOAD_TOO_LARGE"),
            AppError::WorkflowState(_) => (StatusCode::CONFLICT, "WORKFLOW_STATE_ERROR"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Service(e) => {
                tracing::error!("LLM error: {e}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR")
            }
            AppError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.user_message()
            }
        }));

        (status, body).into_response()
    }
}
