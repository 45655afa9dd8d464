//! Job Discovery — two calls per search.
//!
//! Flow: discovery (web search, free text + grounding sources) →
//!       structuring (schema-checked JSON array) → normalize ids and scores.
//!
//! A failure in either phase aborts the run. No partial job list is returned.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::schema::ResponseSchema;
use crate::extraction::{ExtractionError, StructuredClient};
use crate::llm_client::prompts::{fill_template, json_system};
use crate::llm_client::{GenerationRequest, GroundingSource};
use crate::models::{Job, Profile};

pub mod normalize;
pub mod prompts;

use normalize::{normalize_batch, RawJob};
use prompts::{
    DISCOVERY_PROMPT_TEMPLATE, DISCOVERY_SYSTEM, STRUCTURING_PROMPT_TEMPLATE, STRUCTURING_SYSTEM,
};

/// Search parameters that do not come from the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub platforms: Vec<String>,
    /// Used when the profile has no preferred location.
    pub default_location: String,
    pub salary_currency: String,
    pub listing_count: u32,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            platforms: vec!["LinkedIn".to_string(), "Naukri".to_string()],
            default_location: "India".to_string(),
            salary_currency: "INR".to_string(),
            listing_count: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    Discovering,
    Structuring,
    Done,
    Failed,
}

impl fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryPhase::Discovering => "discovering",
            DiscoveryPhase::Structuring => "structuring",
            DiscoveryPhase::Done => "done",
            DiscoveryPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryOutcome {
    pub jobs: Vec<Job>,
    pub sources: Vec<GroundingSource>,
}

#[derive(Clone)]
pub struct DiscoveryPipeline {
    client: StructuredClient,
    settings: DiscoverySettings,
}

impl DiscoveryPipeline {
    pub fn new(client: StructuredClient, settings: DiscoverySettings) -> Self {
        Self { client, settings }
    }

    pub async fn run(&self, profile: &Profile) -> Result<DiscoveryOutcome, AppError> {
        let mut phase = DiscoveryPhase::Discovering;
        info!(phase = %phase, "Searching jobs for {:?}", profile.headline);

        let discovery = match self
            .client
            .complete("job discovery", &build_discovery_request(profile, &self.settings))
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(fail(phase, e)),
        };
        let raw_text = discovery.text.unwrap_or_default();
        let sources = discovery.sources;

        phase = DiscoveryPhase::Structuring;
        info!(
            phase = %phase,
            "Discovery returned {} chars and {} grounding sources",
            raw_text.len(),
            sources.len()
        );

        let request = build_structuring_request(&raw_text, &sources, &self.settings);
        let raw_jobs: Vec<RawJob> = match self.client.extract("job structuring", &request).await {
            Ok(jobs) => jobs,
            Err(e) => return Err(fail(phase, e)),
        };

        let jobs = normalize_batch(raw_jobs);
        info!(phase = %DiscoveryPhase::Done, "Structured {} jobs", jobs.len());
        Ok(DiscoveryOutcome { jobs, sources })
    }
}

fn fail(phase: DiscoveryPhase, error: ExtractionError) -> AppError {
    warn!(phase = %DiscoveryPhase::Failed, "Job search failed while {phase}: {error}");
    error.into()
}

pub fn job_array_schema() -> ResponseSchema {
    let job = ResponseSchema::object(
        [
            ("id", ResponseSchema::string()),
            ("title", ResponseSchema::string()),
            ("company", ResponseSchema::string()),
            ("location", ResponseSchema::string()),
            ("platform", ResponseSchema::string()),
            ("description", ResponseSchema::string()),
            ("url", ResponseSchema::string().describe("Direct listing URL")),
            (
                "match_score",
                ResponseSchema::number().describe("Fit between 0 and 1"),
            ),
            ("match_reason", ResponseSchema::string()),
            ("responsibilities", ResponseSchema::string_array()),
            ("requirements", ResponseSchema::string_array()),
            ("skills_required", ResponseSchema::string_array()),
            ("experience_required", ResponseSchema::string()),
            ("salary", ResponseSchema::string()),
            ("posted_date", ResponseSchema::string()),
        ],
        &["title", "company", "url", "salary", "platform"],
    );
    ResponseSchema::array(job)
}

pub fn build_discovery_request(profile: &Profile, settings: &DiscoverySettings) -> GenerationRequest {
    let location = profile
        .preferred_location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&settings.default_location);
    let years = profile.total_years_experience.unwrap_or(0);

    let count = settings.listing_count.to_string();
    let platforms = settings.platforms.join(" and ");
    let years = years.to_string();

    let prompt = fill_template(
        DISCOVERY_PROMPT_TEMPLATE,
        &[
            ("count", count.as_str()),
            ("headline", profile.headline.as_str()),
            ("location", location),
            ("platforms", platforms.as_str()),
            ("years", years.as_str()),
        ],
    );

    GenerationRequest::text(DISCOVERY_SYSTEM, prompt).with_web_search()
}

pub fn build_structuring_request(
    raw_text: &str,
    sources: &[GroundingSource],
    settings: &DiscoverySettings,
) -> GenerationRequest {
    let sources_json = serde_json::to_string_pretty(sources).unwrap_or_else(|_| "[]".to_string());
    let prompt = fill_template(
        STRUCTURING_PROMPT_TEMPLATE,
        &[
            ("currency", settings.salary_currency.as_str()),
            ("raw_text", raw_text),
            ("sources_json", sources_json.as_str()),
        ],
    );

    GenerationRequest::text(json_system(STRUCTURING_SYSTEM), prompt).with_schema(job_array_schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::testing::ScriptedService;
    use crate::llm_client::{ContentPart, LlmError};

    fn profile() -> Profile {
        Profile {
            name: "Asha Rao".into(),
            headline: "Backend Engineer".into(),
            summary: String::new(),
            skills: vec!["Go".into()],
            experience: vec![],
            total_years_experience: Some(6),
            preferred_location: None,
            email: None,
            source_file: "asha.txt".into(),
        }
    }

    fn pipeline(service: Arc<ScriptedService>) -> DiscoveryPipeline {
        let client = StructuredClient::new(service, RetryPolicy::default(), Duration::from_secs(30));
        DiscoveryPipeline::new(client, DiscoverySettings::default())
    }

    fn prompt_text(request: &GenerationRequest) -> &str {
        match &request.parts[0] {
            ContentPart::Text(t) => t,
            other => panic!("expected text part, got {other:?}"),
        }
    }

    const TWO_JOBS: &str = r#"[
        {"title": "Backend Engineer", "company": "Acme", "url": "https://linkedin.com/jobs/1",
         "salary": "25-35 LPA", "platform": "LinkedIn", "match_score": 0.92},
        {"id": "nk-7", "title": "Go Developer", "company": "Globex", "url": "https://naukri.com/7",
         "salary": "Not disclosed", "platform": "Naukri", "match_score": 60}
    ]"#;

    #[tokio::test]
    async fn test_two_phase_run_normalizes_scores_and_keeps_sources() {
        let service = Arc::new(
            ScriptedService::new()
                .reply_with_sources("Acme is hiring a backend engineer...", &["https://linkedin.com/jobs/1"])
                .reply(TWO_JOBS),
        );

        let outcome = pipeline(service.clone()).run(&profile()).await.unwrap();

        assert_eq!(outcome.jobs.len(), 2);
        assert_eq!(outcome.jobs[0].match_score, 92);
        assert_eq!(outcome.jobs[1].match_score, 60);
        assert_eq!(outcome.jobs[1].id, "nk-7");
        assert!(!outcome.jobs[0].id.is_empty());
        assert_eq!(outcome.sources[0].url, "https://linkedin.com/jobs/1");

        let requests = service.requests();
        assert!(requests[0].web_search);
        assert!(requests[0].schema.is_none());
        assert!(!requests[1].web_search);
        assert!(requests[1].schema.is_some());
        let structuring = prompt_text(&requests[1]);
        assert!(structuring.contains("Acme is hiring a backend engineer..."));
        assert!(structuring.contains("https://linkedin.com/jobs/1"));
    }

    #[tokio::test]
    async fn test_discovery_prompt_uses_profile_and_defaults() {
        let request = build_discovery_request(&profile(), &DiscoverySettings::default());
        let prompt = prompt_text(&request);
        assert!(prompt.contains("\"Backend Engineer\" in India on LinkedIn and Naukri"));
        assert!(prompt.contains("approximately 6 years"));

        let mut located = profile();
        located.preferred_location = Some("Pune".into());
        located.total_years_experience = None;
        let request = build_discovery_request(&located, &DiscoverySettings::default());
        assert!(prompt_text(&request).contains("in Pune on"));
        assert!(prompt_text(&request).contains("approximately 0 years"));
    }

    #[test]
    fn test_placeholder_text_in_inputs_is_not_substituted() {
        let mut braced = profile();
        braced.headline = "Engineer {location}".into();
        let request = build_discovery_request(&braced, &DiscoverySettings::default());
        assert!(prompt_text(&request).contains("\"Engineer {location}\" in India"));

        let request = build_structuring_request(
            "Acme lists {sources_json} and {currency}",
            &[],
            &DiscoverySettings::default(),
        );
        let prompt = prompt_text(&request);
        assert!(prompt.contains("Acme lists {sources_json} and {currency}"));
        assert!(prompt.contains("expressed in INR"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_failure_skips_structuring() {
        let service = Arc::new(ScriptedService::always(|| {
            LlmError::RateLimited("quota exhausted".into())
        }));

        let err = pipeline(service.clone()).run(&profile()).await.unwrap_err();

        assert!(matches!(err, AppError::TransientService(_)));
        assert_eq!(service.calls(), 4);
        assert!(service.requests().iter().all(|r| r.web_search));
    }

    #[tokio::test]
    async fn test_structuring_missing_url_fails_whole_batch() {
        let service = Arc::new(
            ScriptedService::new()
                .reply("notes")
                .reply(r#"[{"title": "t", "company": "c", "salary": "s", "platform": "p"}]"#),
        );

        let err = pipeline(service).run(&profile()).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaValidation(msg) if msg.contains("`url`")));
    }

    #[tokio::test]
    async fn test_empty_structuring_output_is_an_empty_batch() {
        let service = Arc::new(ScriptedService::new().reply("nothing found").empty_reply());
        let outcome = pipeline(service).run(&profile()).await.unwrap();
        assert!(outcome.jobs.is_empty());
    }
}
