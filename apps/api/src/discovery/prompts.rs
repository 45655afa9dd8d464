// Job discovery prompt templates.
// Phase 1 browses freely with web search; phase 2 only reformats.

pub const DISCOVERY_SYSTEM: &str = "\
You are a job sourcing agent with live web search. \
Find currently open listings only, on the platforms you are told to use. \
For every listing report the title, company, location, platform, salary if shown, \
a short description, key requirements and the direct listing URL.";

/// Replace: {count}, {headline}, {location}, {platforms}, {years}
pub const DISCOVERY_PROMPT_TEMPLATE: &str = "\
Find {count} active job listings for \"{headline}\" in {location} on {platforms}. \
Focus on roles requiring approximately {years} years of experience. \
Return descriptive snippets and the listing URLs.";

pub const STRUCTURING_SYSTEM: &str = "\
You convert job search notes into clean structured records. \
Use only listings present in the notes. Never invent listings or URLs.";

/// Replace: {currency}, {raw_text}, {sources_json}
pub const STRUCTURING_PROMPT_TEMPLATE: &str = r#"Convert the following job data into a JSON array of job records.

RULES:
1. One record per distinct listing in the raw data.
2. url must be the direct listing URL, taken from the verified grounding sources when available.
3. salary must be expressed in {currency} as a single human-readable range (e.g. "18-24 LPA"); use "Not disclosed" if unknown.
4. match_score is a number between 0 and 1 for how well the listing fits the search; 0.9-1.0 only if highly relevant.
5. match_reason is one sentence explaining the score.

RAW DATA:
{raw_text}

VERIFIED GROUNDING SOURCES:
{sources_json}"#;
