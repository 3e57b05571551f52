use anyhow::{Context, Result};

use crate::optimizer::policy::ScoreBoostPolicy;
use crate::suggestions::validator::DEFAULT_CAP;

/// S3 / MinIO settings for storing optimized documents.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
///
/// Everything except the log level is optional: without an API key the
/// deterministic scorer and keyword fallback are used, and without
/// `DATABASE_URL` artifacts stay in memory.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub database_url: Option<String>,
    pub s3: Option<S3Config>,
    pub replacement_cap: usize,
    pub score_boost: ScoreBoostPolicy,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3 = match optional_env("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            database_url: optional_env("DATABASE_URL"),
            s3,
            replacement_cap: optional_env("REPLACEMENT_CAP")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("REPLACEMENT_CAP must be a non-negative integer")?
                .unwrap_or(DEFAULT_CAP),
            score_boost: parse_boost(optional_env("SCORE_BOOST").as_deref())?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_boost(value: Option<&str>) -> Result<ScoreBoostPolicy> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("on") | Some("true") | Some("1") => Ok(ScoreBoostPolicy::Guaranteed),
        Some("off") | Some("false") | Some("0") => Ok(ScoreBoostPolicy::Disabled),
        Some(other) => anyhow::bail!("SCORE_BOOST must be 'on' or 'off', got '{other}'"),
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
