//! Profile extraction — resume content in, validated `Profile` out.

use tracing::info;

use crate::errors::AppError;
use crate::extraction::schema::ResponseSchema;
use crate::extraction::StructuredClient;
use crate::llm_client::prompts::json_system;
use crate::llm_client::GenerationRequest;
use crate::models::Profile;
use crate::profile::ingest::ResumeDocument;
use crate::profile::prompts::{PROFILE_EXTRACTION_PROMPT, PROFILE_SYSTEM};

pub fn profile_schema() -> ResponseSchema {
    let experience = ResponseSchema::object(
        [
            ("company", ResponseSchema::string()),
            ("role", ResponseSchema::string()),
            ("duration", ResponseSchema::string()),
            ("description", ResponseSchema::string()),
        ],
        &["company", "role"],
    );

    ResponseSchema::object(
        [
            ("name", ResponseSchema::string()),
            ("headline", ResponseSchema::string()),
            ("summary", ResponseSchema::string()),
            ("skills", ResponseSchema::string_array()),
            ("experience", ResponseSchema::array(experience)),
            (
                "total_years_experience",
                ResponseSchema::number().describe("Whole years of professional experience"),
            ),
            ("preferred_location", ResponseSchema::string()),
            ("email", ResponseSchema::string()),
        ],
        &["name", "headline", "summary", "skills", "experience"],
    )
}

pub fn build_profile_request(document: &ResumeDocument) -> GenerationRequest {
    GenerationRequest::text(json_system(PROFILE_SYSTEM), PROFILE_EXTRACTION_PROMPT)
        .with_part(document.to_part())
        .with_schema(profile_schema())
}

/// Extracts a profile from an ingested resume. The origin file name is
/// recorded locally; the service never sets it.
pub async fn analyze_resume(
    client: &StructuredClient,
    document: &ResumeDocument,
) -> Result<Profile, AppError> {
    let request = build_profile_request(document);
    let mut profile: Profile = client.extract("resume analysis", &request).await?;
    profile.source_file = document.file_name.clone();

    info!(
        "Profile extracted from '{}': headline={:?}, {} skills, {} roles",
        document.file_name,
        profile.headline,
        profile.skills.len(),
        profile.experience.len()
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::testing::ScriptedService;
    use crate::llm_client::ContentPart;

    fn client(service: Arc<ScriptedService>) -> StructuredClient {
        StructuredClient::new(service, RetryPolicy::default(), Duration::from_secs(30))
    }

    const PROFILE_JSON: &str = r#"{
        "name": "Asha Rao",
        "headline": "Backend Engineer",
        "summary": "Builds distributed systems in Go.",
        "skills": ["Go", "Distributed Systems"],
        "experience": [{"company": "Acme", "role": "SDE II", "duration": "2019 - Present", "description": "Payments"}],
        "total_years_experience": 6,
        "preferred_location": "Bengaluru"
    }"#;

    #[tokio::test]
    async fn test_analyze_text_resume() {
        let service = Arc::new(ScriptedService::new().reply(PROFILE_JSON));
        let doc = ResumeDocument::from_upload("asha.txt", b"Asha Rao, Go engineer").unwrap();

        let profile = analyze_resume(&client(service.clone()), &doc).await.unwrap();

        assert_eq!(profile.skills, vec!["Go", "Distributed Systems"]);
        assert_eq!(profile.total_years_experience, Some(6));
        assert_eq!(profile.source_file, "asha.txt");

        let request = &service.requests()[0];
        assert!(request.schema.is_some());
        assert!(!request.web_search);
        assert!(matches!(&request.parts[1], ContentPart::Text(t) if t.contains("Asha Rao, Go engineer")));
    }

    #[tokio::test]
    async fn test_analyze_pdf_sends_document_part() {
        let service = Arc::new(ScriptedService::new().reply(PROFILE_JSON));
        let doc = ResumeDocument::from_upload("asha.pdf", b"%PDF-1.7 ...").unwrap();

        analyze_resume(&client(service.clone()), &doc).await.unwrap();

        let request = &service.requests()[0];
        assert!(matches!(
            &request.parts[1],
            ContentPart::Document { media_type, .. } if media_type == "application/pdf"
        ));
    }

    #[tokio::test]
    async fn test_incomplete_profile_is_schema_failure() {
        let service = Arc::new(ScriptedService::new().reply(r#"{"name": "Asha"}"#));
        let doc = ResumeDocument::from_upload("asha.txt", b"Asha").unwrap();

        let err = analyze_resume(&client(service), &doc).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaValidation(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_schema_failure() {
        let service = Arc::new(ScriptedService::new().empty_reply());
        let doc = ResumeDocument::from_upload("asha.txt", b"Asha").unwrap();

        let err = analyze_resume(&client(service), &doc).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaValidation(_)));
    }
}
