use serde::{Deserialize, Deserializer, Serialize};

use crate::models::null_as_default;

/// Candidate profile extracted from an uploaded resume.
/// Replaced wholesale on re-onboarding, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub headline: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    /// Whole years; fractional answers from the service are rounded.
    #[serde(default, deserialize_with = "whole_years")]
    pub total_years_experience: Option<u32>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Name of the uploaded file. Set locally, never by the service.
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

fn whole_years<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let years = Option::<f64>::deserialize(deserializer)?;
    Ok(years
        .filter(|y| y.is_finite() && *y >= 0.0)
        .map(|y| y.round() as u32))
}
