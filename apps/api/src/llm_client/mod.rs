/// LLM Client — the single point of entry for all generative-service calls in JobPilot.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Stages talk to `dyn GenerativeService`; `LlmClient` is the production backend.
///
/// One call = one HTTP attempt. Retrying lives in `retry` and is applied by the
/// extraction client, so every stage shares the same backoff policy.
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::schema::ResponseSchema;

pub mod prompts;
pub mod retry;
#[cfg(test)]
pub mod testing;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in JobPilot.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 8192;
const WEB_SEARCH_TOOL: &str = "web_search_20250305";
const WEB_SEARCH_MAX_USES: u32 = 5;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM call timed out")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service overloaded: {0}")]
    Overloaded(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Credentials rejected (status {status})")]
    Unauthorized { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LlmError {
    /// Retry classifier. Only quota/rate-limit and overload signals are worth
    /// waiting out. A plain 5xx and a 404 fail on the first attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimited(_) | LlmError::Overloaded(_))
    }

    /// Maps a non-success HTTP status and body to the matching error.
    fn from_status(status: u16, body: String) -> Self {
        let parsed = serde_json::from_str::<AnthropicError>(&body).ok();
        let error_type = parsed.as_ref().map(|e| e.error.error_type.as_str());
        let message = parsed
            .as_ref()
            .map(|e| e.error.message.clone())
            .unwrap_or(body);

        match (status, error_type) {
            (429, _) | (_, Some("rate_limit_error")) => LlmError::RateLimited(message),
            (529, _) | (_, Some("overloaded_error")) => LlmError::Overloaded(message),
            (401 | 403, _) => LlmError::Unauthorized { status },
            (404, _) => LlmError::NotFound(message),
            _ => LlmError::Api { status, message },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Service boundary
// ────────────────────────────────────────────────────────────────────────────

/// One piece of user content sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// Binary payload, already base64-encoded for transmission.
    Document {
        media_type: String,
        data_base64: String,
    },
}

/// A provider-neutral request: system instruction, content, optional grounding
/// and an optional declared output schema.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub parts: Vec<ContentPart>,
    pub web_search: bool,
    pub schema: Option<ResponseSchema>,
}

impl GenerationRequest {
    pub fn text(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            parts: vec![ContentPart::Text(prompt.into())],
            web_search: false,
            schema: None,
        }
    }

    pub fn with_part(mut self, part: ContentPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// System prompt with the declared schema appended, if any.
    pub fn system_prompt(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}\n\nOUTPUT SCHEMA (respond with JSON conforming to it):\n{}",
                self.system,
                schema.to_prompt_json()
            ),
            None => self.system.clone(),
        }
    }
}

/// A web reference the service used to support its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    pub text: Option<String>,
    pub sources: Vec<GroundingSource>,
}

/// The external generative capability. Implement this to swap providers
/// without touching any stage.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text { text: &'a str },
    Document { source: DocumentSource<'a> },
}

#[derive(Debug, Serialize)]
struct DocumentSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: &'static str,
    max_uses: u32,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default)]
        citations: Option<Vec<Citation>>,
    },
    WebSearchToolResult {
        #[serde(default)]
        content: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenates every text block. With web search enabled the answer is
    /// split around tool blocks, so the first block alone is not enough.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Grounding references from search results and citations, first-seen order.
    pub fn sources(&self) -> Vec<GroundingSource> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        let mut push = |url: Option<&str>, title: Option<&str>| {
            if let Some(url) = url.filter(|u| !u.is_empty()) {
                if seen.insert(url.to_string()) {
                    sources.push(GroundingSource {
                        url: url.to_string(),
                        title: title.map(String::from),
                    });
                }
            }
        };

        for block in &self.content {
            match block {
                ContentBlock::WebSearchToolResult { content } => {
                    for result in content.as_array().into_iter().flatten() {
                        push(
                            result.get("url").and_then(|v| v.as_str()),
                            result.get("title").and_then(|v| v.as_str()),
                        );
                    }
                }
                ContentBlock::Text {
                    citations: Some(citations),
                    ..
                } => {
                    for c in citations {
                        push(c.url.as_deref(), c.title.as_deref());
                    }
                }
                _ => {}
            }
        }
        sources
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

/// The production generative service: Anthropic Messages API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            api_url,
        })
    }

    fn build_body<'a>(request: &'a GenerationRequest) -> AnthropicRequest<'a> {
        let content = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => RequestBlock::Text { text },
                ContentPart::Document {
                    media_type,
                    data_base64,
                } => RequestBlock::Document {
                    source: DocumentSource {
                        source_type: "base64",
                        media_type,
                        data: data_base64,
                    },
                },
            })
            .collect();

        let tools = if request.web_search {
            vec![AnthropicTool {
                tool_type: WEB_SEARCH_TOOL,
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            }]
        } else {
            Vec::new()
        };

        AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: request.system_prompt(),
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
            tools,
        }
    }
}

#[async_trait]
impl GenerativeService for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let body = Self::build_body(request);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let llm_response: LlmResponse = serde_json::from_str(&response.text().await?)?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(GenerationResponse {
            text: llm_response.text(),
            sources: llm_response.sources(),
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
