use serde::{Deserialize, Serialize};

/// A job listing after normalization. `id` is always non-empty and
/// `match_score` is always within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    /// Source platform tag, e.g. "LinkedIn".
    pub platform: String,
    pub description: String,
    pub url: String,
    pub match_score: u8,
    pub match_reason: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub skills_required: Vec<String>,
    pub experience_required: String,
    pub salary: String,
    pub posted_date: Option<String>,
}
