//! Application drafting — one schema-checked call per job.

use tracing::info;

use crate::application::prompts::{DRAFTING_PROMPT_TEMPLATE, DRAFTING_SYSTEM};
use crate::errors::AppError;
use crate::extraction::schema::ResponseSchema;
use crate::extraction::StructuredClient;
use crate::llm_client::prompts::{fill_template, json_system, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::GenerationRequest;
use crate::models::{ApplicationPackage, Job, Profile};

pub fn package_schema() -> ResponseSchema {
    ResponseSchema::object(
        [
            ("job_id", ResponseSchema::string()),
            ("cover_letter", ResponseSchema::string()),
            ("resume_tailoring_tips", ResponseSchema::string_array()),
            (
                "suggested_answers",
                ResponseSchema::map(ResponseSchema::string())
                    .describe("Short answers keyed by topic, e.g. why_us"),
            ),
            (
                "required_additional_info",
                ResponseSchema::string_array()
                    .describe("Screening questions the candidate must answer before submitting"),
            ),
        ],
        &["cover_letter", "resume_tailoring_tips", "required_additional_info"],
    )
}

pub fn build_drafting_request(profile: &Profile, job: &Job) -> Result<GenerationRequest, AppError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;
    let job_json = serde_json::to_string_pretty(job)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize job: {e}")))?;

    let prompt = fill_template(
        DRAFTING_PROMPT_TEMPLATE,
        &[
            ("no_fabrication", NO_FABRICATION_INSTRUCTION),
            ("profile_json", profile_json.as_str()),
            ("job_json", job_json.as_str()),
        ],
    );

    Ok(GenerationRequest::text(json_system(DRAFTING_SYSTEM), prompt).with_schema(package_schema()))
}

/// Drafts application materials for `job`. The package is always tied to
/// `job.id`, whatever id the service echoed back.
pub async fn draft_application(
    client: &StructuredClient,
    profile: &Profile,
    job: &Job,
) -> Result<ApplicationPackage, AppError> {
    let request = build_drafting_request(profile, job)?;
    let mut package: ApplicationPackage = client.extract("application drafting", &request).await?;
    package.job_id = job.id.clone();

    info!(
        "Drafted application for job {} ({} at {}): {} tips, {} required questions",
        job.id,
        job.title,
        job.company,
        package.resume_tailoring_tips.len(),
        package.required_additional_info.len()
    );
    Ok(package)
}
