use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::discovery::DiscoverySettings;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::DEFAULT_API_URL;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_api_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_timeout: Duration,
    /// Body limit for resume uploads.
    pub max_upload_bytes: usize,
    pub retry: RetryPolicy,
    pub discovery: DiscoverySettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = DiscoverySettings::default();
        let platforms = std::env::var("JOB_PLATFORMS")
            .map(|v| parse_list(&v))
            .unwrap_or(defaults.platforms);

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            anthropic_api_url: std::env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 60)?),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            retry: RetryPolicy {
                max_retries: env_or("LLM_MAX_RETRIES", 3)?,
                base_delay: Duration::from_millis(env_or("LLM_BACKOFF_BASE_MS", 2000)?),
                multiplier: env_or("LLM_BACKOFF_MULTIPLIER", 2.0)?,
                max_jitter: Duration::from_millis(env_or("LLM_BACKOFF_JITTER_MS", 500)?),
            },
            discovery: DiscoverySettings {
                platforms,
                default_location: std::env::var("DEFAULT_JOB_LOCATION")
                    .unwrap_or(defaults.default_location),
                salary_currency: std::env::var("SALARY_CURRENCY")
                    .unwrap_or(defaults.salary_currency),
                listing_count: env_or("JOB_LISTING_COUNT", defaults.listing_count)?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_skips_blanks() {
        assert_eq!(
            parse_list(" LinkedIn, Naukri ,,Indeed"),
            vec!["LinkedIn", "Naukri", "Indeed"]
        );
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u32 = env_or("JOBPILOT_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
