use std::sync::{Arc, Mutex};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::client::config::Config;
use crate::client::stats::Stats;
use crate::types;

pub(crate) mod config;
mod consts;
pub(crate) mod stats;
mod utils;

/// HTTP client for the interview backend.
pub struct Client {
    http: reqwest::Client,
    config: Config,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(utils::build_headers(&config)?)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn stats(&self) -> Result<Stats> {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .map_err(|_| anyhow!("failed to get stats"))
    }

    fn record(&self, success: bool) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.record(success);
        } else {
            tracing::error!("failed to update stats");
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = utils::build_url(&self.config, path);
        tracing::debug!("POST {}", url);
        let result = self.http.post(&url).json(body).send().await;
        self.read(&url, result).await
    }

    async fn get<R>(&self, path: &str, query: &[(&str, &str)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = utils::build_url(&self.config, path);
        tracing::debug!("GET {}", url);
        let result = self.http.get(&url).query(query).send().await;
        self.read(&url, result).await
    }

    async fn read<R>(&self, url: &str, result: reqwest::Result<reqwest::Response>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.record(false);
                return Err(e).with_context(|| format!("request to {url} failed"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.record(false);
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|json| json.get("message")?.as_str().map(str::to_string))
                .unwrap_or(body);
            tracing::error!("{} returned {}: {}", url, status, detail);
            return Err(anyhow!("{url} returned {status}: {detail}"));
        }

        match response.json::<R>().await {
            Ok(body) => {
                self.record(true);
                Ok(body)
            }
            Err(e) => {
                self.record(false);
                Err(e).with_context(|| format!("unexpected response body from {url}"))
            }
        }
    }

    pub async fn generate_session(
        &self,
        criteria: &types::SessionCriteria,
    ) -> Result<types::GenerateSessionResponse> {
        let response: types::GenerateSessionResponse =
            self.post(consts::GENERATE_SESSION_PATH, criteria).await?;
        tracing::info!(
            "Generated session {} with {} questions",
            response.session_id,
            response.questions.len()
        );
        Ok(response)
    }

    pub async fn get_audio_phrases(
        &self,
        language: &str,
        voice_id: &str,
    ) -> Result<types::AudioPhrases> {
        self.get(
            consts::AUDIO_PHRASES_PATH,
            &[("language", language), ("voiceId", voice_id)],
        )
        .await
    }

    pub async fn validate_answer(
        &self,
        request: &types::ValidateAnswerRequest,
    ) -> Result<types::ValidateAnswerResponse> {
        self.post(consts::VALIDATE_ANSWER_PATH, request).await
    }

    pub async fn finalize_session(
        &self,
        session_id: &str,
    ) -> Result<types::FinalizeSessionResponse> {
        let request = types::FinalizeSessionRequest {
            session_id: session_id.to_string(),
        };
        self.post(consts::FINALIZE_SESSION_PATH, &request).await
    }

    pub async fn charge_tokens(
        &self,
        session_id: &str,
        amount: u32,
    ) -> Result<types::ChargeTokensResponse> {
        let request = types::ChargeTokensRequest {
            session_id: session_id.to_string(),
            amount,
        };
        let response: types::ChargeTokensResponse =
            self.post(consts::CHARGE_TOKENS_PATH, &request).await?;
        if response.success {
            if let Ok(mut stats) = self.stats.lock() {
                stats.add_charge(amount);
            }
        }
        tracing::debug!(
            "Charged {} tokens, remaining: {:?}",
            amount,
            response.remaining_tokens
        );
        Ok(response)
    }
}

pub fn connect_with_config(config: Config) -> Result<Client> {
    Client::new(config)
}

/// Builds a client from `INTERVIEW_API_URL` and `INTERVIEW_API_KEY`.
pub fn connect() -> Result<Client> {
    connect_with_config(Config::new())
}
