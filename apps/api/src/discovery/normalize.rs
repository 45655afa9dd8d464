//! Post-processing for structured job records: identifiers and match scores.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

use crate::models::{null_as_default, Job};

/// Score given to a listing the service returned without one.
pub const DEFAULT_MATCH_SCORE: u8 = 85;
const GENERATED_ID_LEN: usize = 9;

/// A job record exactly as the structuring call returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    pub platform: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub match_reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills_required: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience_required: String,
    pub salary: String,
    #[serde(default)]
    pub posted_date: Option<String>,
}

/// Maps a 0–1 fraction or a 0–100 percentage onto whole points in 0..=100.
pub fn normalize_score(raw: Option<f64>) -> u8 {
    match raw {
        Some(score) if score.is_finite() => {
            let percent = if score > 1.0 { score } else { score * 100.0 };
            percent.round().clamp(0.0, 100.0) as u8
        }
        _ => DEFAULT_MATCH_SCORE,
    }
}

/// Short lowercase alphanumeric token, unique enough for one session.
pub fn generate_job_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Normalizes a batch: every job ends up with a score in range and an id
/// that is non-blank and unique within the batch.
pub fn normalize_batch(raw: Vec<RawJob>) -> Vec<Job> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|r| {
            let mut id = r
                .id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(generate_job_id);
            while !seen.insert(id.clone()) {
                id = generate_job_id();
            }

            Job {
                id,
                title: r.title,
                company: r.company,
                location: r.location,
                platform: r.platform,
                description: r.description,
                url: r.url,
                match_score: normalize_score(r.match_score),
                match_reason: r.match_reason,
                responsibilities: r.responsibilities,
                requirements: r.requirements,
                skills_required: r.skills_required,
                experience_required: r.experience_required,
                salary: r.salary,
                posted_date: r.posted_date,
            }
        })
        .collect()
}
