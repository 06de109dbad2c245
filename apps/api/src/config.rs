use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::embedding;
use crate::recommendation::recommender::{DEFAULT_TOP_K, TOP_K_MAX, TOP_K_MIN};

const MAX_CONCURRENT_SUMMARIES_LIMIT: usize = 16;

/// Application configuration loaded from environment variables.
/// Every value has a default; out-of-range values fail startup with a clear
/// message rather than producing a half-working pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Unset disables the AI summary path for the whole run (fallback-only);
    /// this is a supported mode, not an error.
    pub anthropic_api_key: Option<String>,
    pub default_top_k: usize,
    pub embedding_model_name: String,
    /// Minimum raw-text overlap before two same-named candidates merge.
    pub dedup_name_similarity_threshold: f32,
    pub summarizer_timeout: Duration,
    pub max_concurrent_summaries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timeout_secs: f64 = parse_env("SUMMARIZER_TIMEOUT_SECONDS", 20.0)?;
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            bail!("SUMMARIZER_TIMEOUT_SECONDS must be a positive number, got {timeout_secs}");
        }

        let config = Config {
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            default_top_k: parse_env("DEFAULT_TOP_K", DEFAULT_TOP_K)?,
            embedding_model_name: std::env::var("EMBEDDING_MODEL_NAME")
                .unwrap_or_else(|_| embedding::DEFAULT_MODEL_NAME.to_string()),
            dedup_name_similarity_threshold: parse_env("DEDUP_NAME_SIMILARITY_THRESHOLD", 0.8f32)?,
            summarizer_timeout: Duration::from_secs_f64(timeout_secs),
            max_concurrent_summaries: parse_env("MAX_CONCURRENT_SUMMARIES", 3usize)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(TOP_K_MIN..=TOP_K_MAX).contains(&self.default_top_k) {
            bail!(
                "DEFAULT_TOP_K must be between {TOP_K_MIN} and {TOP_K_MAX}, got {}",
                self.default_top_k
            );
        }
        if !(0.0..=1.0).contains(&self.dedup_name_similarity_threshold) {
            bail!(
                "DEDUP_NAME_SIMILARITY_THRESHOLD must be between 0.0 and 1.0, got {}",
                self.dedup_name_similarity_threshold
            );
        }
        if !(1..=MAX_CONCURRENT_SUMMARIES_LIMIT).contains(&self.max_concurrent_summaries) {
            bail!(
                "MAX_CONCURRENT_SUMMARIES must be between 1 and {MAX_CONCURRENT_SUMMARIES_LIMIT}, got {}",
                self.max_concurrent_summaries
            );
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Present-and-non-blank env var, or None.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
