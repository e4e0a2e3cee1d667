use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

use crate::services::polling::BackoffPolicy;

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// PostgreSQL connection string
    #[garde(length(min = 1))]
    pub database_url: String,

    /// Redis connection string for job queue
    #[garde(length(min = 1))]
    pub redis_url: String,

    /// HS256 secret shared with the authentication provider
    #[garde(length(min = 16))]
    pub jwt_secret: String,

    /// Gemini API key (embeddings and lyric drafting)
    #[garde(length(min = 1))]
    pub gemini_api_key: String,

    #[serde(default = "default_gemini_base_url")]
    #[garde(length(min = 1))]
    pub gemini_base_url: String,

    #[serde(default = "default_embedding_model")]
    #[garde(length(min = 1))]
    pub embedding_model: String,

    #[serde(default = "default_text_model")]
    #[garde(length(min = 1))]
    pub text_model: String,

    /// Music generation API key
    #[garde(length(min = 1))]
    pub music_api_key: String,

    #[serde(default = "default_music_api_base_url")]
    #[garde(length(min = 1))]
    pub music_api_base_url: String,

    #[serde(default = "default_music_model_version")]
    #[garde(length(min = 1))]
    pub music_model_version: String,

    /// Number of reference lyrics fed into each draft
    #[serde(default = "default_reference_count")]
    #[garde(range(min = 1, max = 10))]
    pub reference_count: usize,

    /// Minimum cosine similarity for the embedding retrieval tier
    #[serde(default = "default_similarity_threshold")]
    #[garde(range(min = -1.0, max = 1.0))]
    pub similarity_threshold: f32,

    #[serde(default = "default_poll_max_attempts")]
    #[garde(range(min = 1, max = 100))]
    pub poll_max_attempts: u32,

    #[serde(default = "default_poll_interval_secs")]
    #[garde(range(min = 1))]
    pub poll_interval_secs: u64,

    #[serde(default = "default_poll_backoff_multiplier")]
    #[garde(range(min = 1.0, max = 10.0))]
    pub poll_backoff_multiplier: f64,

    #[serde(default = "default_poll_max_delay_secs")]
    #[garde(range(min = 1))]
    pub poll_max_delay_secs: u64,

    /// Overall wall-clock budget for one job's polling loop (0 disables it)
    #[serde(default = "default_poll_max_elapsed_secs")]
    #[garde(skip)]
    pub poll_max_elapsed_secs: u64,

    /// Substitute a placeholder song when audio submission fails
    #[serde(default = "default_placeholder_fallback")]
    #[garde(skip)]
    pub placeholder_fallback: bool,

    #[serde(default = "default_placeholder_delay_secs")]
    #[garde(range(max = 60))]
    pub placeholder_delay_secs: u64,

    /// Timeout applied to every outbound HTTP call
    #[serde(default = "default_http_timeout_secs")]
    #[garde(range(min = 1, max = 600))]
    pub http_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_text_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_music_api_base_url() -> String {
    "https://api.musicapi.ai".to_string()
}

fn default_music_model_version() -> String {
    "chirp-v3-5".to_string()
}

fn default_reference_count() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.1
}

fn default_poll_max_attempts() -> u32 {
    15
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_poll_backoff_multiplier() -> f64 {
    1.5
}

fn default_poll_max_delay_secs() -> u64 {
    120
}

fn default_poll_max_elapsed_secs() -> u64 {
    450
}

fn default_placeholder_fallback() -> bool {
    true
}

fn default_placeholder_delay_secs() -> u64 {
    2
}

fn default_http_timeout_secs() -> u64 {
    60
}

/// Settings for the corpus loader. Only the database is required; Gemini
/// settings are needed when embeddings are computed.
#[derive(Debug, Deserialize, Validate)]
pub struct IngestConfig {
    #[garde(length(min = 1))]
    pub database_url: String,

    #[serde(default)]
    #[garde(inner(length(min = 1)))]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    #[garde(length(min = 1))]
    pub gemini_base_url: String,

    #[serde(default = "default_embedding_model")]
    #[garde(length(min = 1))]
    pub embedding_model: String,

    #[serde(default = "default_text_model")]
    #[garde(length(min = 1))]
    pub text_model: String,

    #[serde(default = "default_http_timeout_secs")]
    #[garde(range(min = 1, max = 600))]
    pub http_timeout_secs: u64,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Backoff policy for the completion polling loop.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.poll_max_attempts,
            interval: Duration::from_secs(self.poll_interval_secs),
            multiplier: self.poll_backoff_multiplier,
            max_delay: Duration::from_secs(self.poll_max_delay_secs),
            max_elapsed: (self.poll_max_elapsed_secs > 0)
                .then(|| Duration::from_secs(self.poll_max_elapsed_secs)),
        }
    }

    pub fn placeholder_delay(&self) -> Duration {
        Duration::from_secs(self.placeholder_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
