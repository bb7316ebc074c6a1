use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        })
    }
}

/// Tuning for the remote job status polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status fetches while the job reports PROCESSING.
    pub poll_interval: Duration,
    /// First backoff delay after a transient fetch failure; doubles per
    /// consecutive failure.
    pub initial_retry_delay: Duration,
    /// Consecutive transient failures tolerated before giving up.
    pub max_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            initial_retry_delay: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub media_file: String,
    pub language: String,
}

impl ClientConfig {
    pub fn new(server_url: String, media_file: String, language: String) -> Self {
        Self {
            server_url,
            media_file,
            language,
        }
    }
}
