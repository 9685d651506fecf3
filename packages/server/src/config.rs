use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::audit::AuditMode;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, conversations and the semantic cache live in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub tavily_api_key: Option<String>,
    /// Base URL of the legal-text retrieval service (`POST /query`, `POST /ingest`).
    pub retrieval_url: Option<String>,
    pub chat_model: String,
    pub classifier_model: String,
    pub audit_model: String,
    pub embedding_model: String,
    pub cache_distance_threshold: f64,
    pub cache_ttl_secs: u64,
    pub max_revisions: u32,
    pub model_timeout_secs: u64,
    pub audit_mode: AuditMode,
    pub escape_currency_glyph: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            port: parse_var("PORT", 8080).context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            tavily_api_key: env::var("TAVILY_API_KEY").ok().filter(|s| !s.is_empty()),
            retrieval_url: env::var("RETRIEVAL_URL").ok().filter(|s| !s.is_empty()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            classifier_model: env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            audit_model: env::var("AUDIT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            cache_distance_threshold: parse_var("CACHE_DISTANCE_THRESHOLD", 0.35)
                .context("CACHE_DISTANCE_THRESHOLD must be a number")?,
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", 86_400)
                .context("CACHE_TTL_SECS must be a whole number of seconds")?,
            max_revisions: parse_var("MAX_REVISIONS", 2)
                .context("MAX_REVISIONS must be a non-negative integer")?,
            model_timeout_secs: parse_var("MODEL_TIMEOUT_SECS", 45)
                .context("MODEL_TIMEOUT_SECS must be a whole number of seconds")?,
            audit_mode: parse_var("AUDIT_MODE", AuditMode::Detached)
                .context("AUDIT_MODE must be 'detached' or 'blocking'")?,
            escape_currency_glyph: parse_var("ESCAPE_CURRENCY_GLYPH", false)
                .context("ESCAPE_CURRENCY_GLYPH must be true or false")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", name, e)),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
