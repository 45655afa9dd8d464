//! Structured extraction — turns a request plus a declared schema into a
//! validated, strongly-typed value.
//!
//! Flow: retry(timeout(service call)) → strip fences → empty ⇒ `{}`/`[]` →
//! parse JSON → validate against schema → deserialize.
//!
//! Stateless apart from configuration; safe to share across concurrent callers.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::retry::{retry_with_backoff, RetryPolicy};
use crate::llm_client::{
    strip_json_fences, GenerationRequest, GenerationResponse, GenerativeService, LlmError,
};

pub mod schema;

use schema::ResponseSchema;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Service(#[from] LlmError),

    #[error("LLM call exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Response failed schema validation: {0}")]
    Schema(String),
}

impl ExtractionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractionError::Service(e) if e.is_transient())
    }
}

#[derive(Clone)]
pub struct StructuredClient {
    service: Arc<dyn GenerativeService>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl StructuredClient {
    pub fn new(service: Arc<dyn GenerativeService>, retry: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            service,
            retry,
            call_timeout,
        }
    }

    /// Free-form call with retry and a per-attempt time limit.
    pub async fn complete(
        &self,
        operation: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExtractionError> {
        retry_with_backoff(&self.retry, operation, ExtractionError::is_transient, || {
            self.attempt(request)
        })
        .await
    }

    /// Schema-constrained call. The request's schema drives both the prompt and validation.
    pub async fn extract<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: &GenerationRequest,
    ) -> Result<T, ExtractionError> {
        let response = self.complete(operation, request).await?;
        parse_structured(response.text.as_deref(), request.schema.as_ref())
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExtractionError> {
        match tokio::time::timeout(self.call_timeout, self.service.generate(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ExtractionError::Timeout(self.call_timeout)),
        }
    }
}

/// Parses and validates raw service output. Retrying never helps here, so
/// every failure is a `Schema` error.
pub fn parse_structured<T: DeserializeOwned>(
    text: Option<&str>,
    schema: Option<&ResponseSchema>,
) -> Result<T, ExtractionError> {
    let raw = text.map(strip_json_fences).unwrap_or("");

    let value: Value = if raw.is_empty() {
        schema.map(ResponseSchema::empty_value).unwrap_or(Value::Null)
    } else {
        serde_json::from_str(raw)
            .map_err(|e| ExtractionError::Schema(format!("response is not valid JSON: {e}")))?
    };

    if let Some(schema) = schema {
        schema
            .validate(&value)
            .map_err(|v| ExtractionError::Schema(v.to_string()))?;
    }

    serde_json::from_value(value).map_err(|e| {
        ExtractionError::Schema(format!("response does not match expected shape: {e}"))
    })
}
