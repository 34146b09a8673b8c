use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use interview_api::types::{
    AudioPhrases, FinalizeSessionResponse, GenerateSessionResponse, SessionCriteria,
    ValidateAnswerRequest, ValidateAnswerResponse,
};
use interview_core::backend::BackendApi;

/// An adapter that implements the `BackendApi` trait for the `interview_api::Client`.
pub struct HttpBackend {
    client: interview_api::Client,
}

impl HttpBackend {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let config = interview_api::Config::builder()
            .with_base_url(api_url)
            .with_api_key(api_key)
            .build();
        let client =
            interview_api::Client::new(config).context("Failed to create interview API client")?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &interview_api::Client {
        &self.client
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn generate_session(
        &self,
        criteria: &SessionCriteria,
    ) -> Result<GenerateSessionResponse> {
        self.client.generate_session(criteria).await
    }

    async fn get_audio_phrases(&self, language: &str, voice_id: &str) -> Result<AudioPhrases> {
        self.client.get_audio_phrases(language, voice_id).await
    }

    async fn validate_answer(
        &self,
        request: &ValidateAnswerRequest,
    ) -> Result<ValidateAnswerResponse> {
        self.client.validate_answer(request).await
    }

    async fn finalize_session(&self, session_id: &str) -> Result<FinalizeSessionResponse> {
        self.client.finalize_session(session_id).await
    }

    async fn charge_tokens(&self, session_id: &str, amount: u32) -> Result<()> {
        let response = self.client.charge_tokens(session_id, amount).await?;
        if response.success {
            Ok(())
        } else {
            Err(anyhow!(
                "backend refused to charge {} tokens for session {}",
                amount,
                session_id
            ))
        }
    }
}
