// Profile onboarding: resume file ingestion and profile extraction.
// All LLM calls go through the structured extraction client.

pub mod analyzer;
pub mod ingest;
pub mod prompts;
