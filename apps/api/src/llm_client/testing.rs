//! Scripted in-memory `GenerativeService` for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationRequest, GenerationResponse, GenerativeService, GroundingSource, LlmError};

type Scripted = Box<dyn Fn() -> Result<GenerationResponse, LlmError> + Send + Sync>;

/// Replays queued responses in order and records every request it receives.
/// When the queue is empty, the fallback (if any) answers instead.
#[derive(Default)]
pub struct ScriptedService {
    queue: Mutex<VecDeque<Result<GenerationResponse, LlmError>>>,
    fallback: Option<Scripted>,
    requests: Mutex<Vec<GenerationRequest>>,
    /// Sleep before answering each call.
    latency: Option<Duration>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that fails every call with the error produced by `make`.
    pub fn always(make: impl Fn() -> LlmError + Send + Sync + 'static) -> Self {
        Self {
            fallback: Some(Box::new(move || Err(make()))),
            ..Self::default()
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(GenerationResponse {
            text: Some(text.to_string()),
            sources: Vec::new(),
        }))
    }

    pub fn reply_with_sources(self, text: &str, urls: &[&str]) -> Self {
        self.push(Ok(GenerationResponse {
            text: Some(text.to_string()),
            sources: urls
                .iter()
                .map(|u| GroundingSource {
                    url: u.to_string(),
                    title: None,
                })
                .collect(),
        }))
    }

    pub fn empty_reply(self) -> Self {
        self.push(Ok(GenerationResponse::default()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error))
    }

    fn push(self, item: Result<GenerationResponse, LlmError>) -> Self {
        self.queue.lock().unwrap().push_back(item);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.queue.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(item), _) => item,
            (None, Some(fallback)) => fallback(),
            (None, None) => Err(LlmError::Api {
                status: 400,
                message: "no scripted reply left".to_string(),
            }),
        }
    }
}
