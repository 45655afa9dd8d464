// Profile extraction prompt templates.
// All prompts for the profile module are defined here.

pub const PROFILE_SYSTEM: &str = "\
You are a precise resume data extractor. \
Parse the candidate's resume into a structured professional profile. \
Extract facts HONESTLY. Never invent employers, roles or skills.";

pub const PROFILE_EXTRACTION_PROMPT: &str = "\
Extract the candidate's professional information from the resume provided below.

RULES:
1. name, headline, summary, skills and experience are mandatory.
2. headline is the candidate's current or target job title in a few words.
3. skills is an ordered list, most prominent first.
4. experience is ordered most recent first; duration is free text (e.g. \"Jan 2020 - Present\").
5. total_years_experience is the total professional experience as a whole number of years.
6. preferred_location is the city the candidate is based in or wants to work in, if stated.
7. Include email only if it appears in the resume.";
