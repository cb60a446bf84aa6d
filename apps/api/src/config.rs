use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub scoring: ScoringSettings,
    /// When set, batch-run progress is published to Redis instead of process memory.
    pub redis_url: Option<String>,
    pub progress_ttl_secs: u64,
    pub s3: Option<S3Config>,
    pub port: u16,
}

/// Where the remote scoring service (local-model tier) lives. Loadable on its own so
/// that commands which only talk to the scoring service need no database.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub api_url: String,
    pub timeout_secs: u64,
}

/// Object storage used to archive exported performance profiles.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            scoring: ScoringSettings::from_env()?,
            redis_url: optional_env("REDIS_URL"),
            progress_ttl_secs: parse_env("PROGRESS_TTL_SECS", 3600)?,
            s3: S3Config::from_env(),
            port: parse_env("PORT", 8080)?,
        })
    }
}

impl ScoringSettings {
    pub fn from_env() -> Result<Self> {
        Ok(ScoringSettings {
            api_url: optional_env("SCORING_API_URL")
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            timeout_secs: parse_env("SCORING_TIMEOUT_SECS", 300)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl S3Config {
    /// All four variables must be present; a partial S3 setup disables archival.
    fn from_env() -> Option<Self> {
        Some(S3Config {
            bucket: optional_env("S3_BUCKET")?,
            endpoint: optional_env("S3_ENDPOINT")?,
            access_key_id: optional_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: optional_env("AWS_SECRET_ACCESS_KEY")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
