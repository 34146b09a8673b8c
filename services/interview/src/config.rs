//! Service configuration.
//!
//! Settings come from the environment, with a `.env` file picked up for local
//! development. Everything the session needs is collected into one `Config`.

use std::env;
use tracing::Level;

/// Samples per chunk handed to the capture controller by file and device microphones.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// Frames per callback for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// The latency for the output audio buffer in milliseconds.
pub const OUTPUT_LATENCY_MS: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub language: String,
    pub voice_id: String,
    pub session_seconds: u32,
    pub token_cost: u32,
    pub max_retries_per_question: Option<u32>,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `INTERVIEW_API_URL`: Base URL of the interview backend. Required.
    // *   `INTERVIEW_API_KEY`: Bearer key for the backend. Required.
    // *   `INTERVIEW_LANGUAGE`: (Optional) Language of the phrase bank. Defaults to "en".
    // *   `INTERVIEW_VOICE_ID`: (Optional) Avatar voice. Defaults to "default".
    // *   `SESSION_SECONDS`: (Optional) Advisory session length. Defaults to 1800.
    // *   `VALIDATION_TOKEN_COST`: (Optional) Tokens charged per validation in interview
    //     mode. Defaults to 1.
    // *   `MAX_RETRIES_PER_QUESTION`: (Optional) Cap on repeats of one question.
    //     Unlimited when unset.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };

        let api_url = required("INTERVIEW_API_URL")?;
        let api_key = required("INTERVIEW_API_KEY")?;
        let language = lookup("INTERVIEW_LANGUAGE").unwrap_or_else(|| "en".to_string());
        let voice_id = lookup("INTERVIEW_VOICE_ID").unwrap_or_else(|| "default".to_string());

        let session_seconds = parse_number(&lookup, "SESSION_SECONDS")?.unwrap_or(1800);
        let token_cost = parse_number(&lookup, "VALIDATION_TOKEN_COST")?.unwrap_or(1);
        let max_retries_per_question = parse_number(&lookup, "MAX_RETRIES_PER_QUESTION")?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            api_url,
            api_key,
            language,
            voice_id,
            session_seconds,
            token_cost,
            max_retries_per_question,
            log_level,
        })
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<u32>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
    }
}
