// Application drafting prompt templates.

pub const DRAFTING_SYSTEM: &str = "\
You are an expert career coach writing high-conversion job applications. \
Write in a confident, specific and professional voice.";

/// Replace: {no_fabrication}, {profile_json}, {job_json}
pub const DRAFTING_PROMPT_TEMPLATE: &str = r#"Draft an application for the job below on behalf of the candidate.

{no_fabrication}

PRODUCE:
1. cover_letter: a tailored cover letter addressed to the hiring team.
2. resume_tailoring_tips: concrete edits the candidate should make to their resume for this role.
3. suggested_answers: short answers keyed by topic, e.g. "why_us" and "relevant_experience".
4. required_additional_info: exactly 3 screening questions a recruiter would ask based on this job description that the candidate must answer personally (e.g. notice period, relocation, expected salary).

CANDIDATE PROFILE:
{profile_json}

JOB:
{job_json}"#;
