use crate::client::consts::{BASE_URL, DEFAULT_TIMEOUT_SECS, INTERVIEW_API_KEY, INTERVIEW_API_URL};
use secrecy::SecretString;
use std::time::Duration;

pub struct Config {
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults, with the URL and key taken from the environment when set.
    pub fn new() -> Self {
        Self {
            base_url: std::env::var(INTERVIEW_API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| BASE_URL.to_string()),
            api_key: std::env::var(INTERVIEW_API_KEY)
                .unwrap_or_default()
                .into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
