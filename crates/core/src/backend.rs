use anyhow::Result;
use async_trait::async_trait;
use interview_api_types::{
    AudioPhrases, FinalizeSessionResponse, GenerateSessionResponse, SessionCriteria,
    ValidateAnswerRequest, ValidateAnswerResponse,
};
#[cfg(test)]
use mockall::automock;

/// The backend service that owns questions, phrase banks and answer judgement.
///
/// The orchestrator only ever talks to this trait, so the HTTP client, a
/// simulated backend and the mocks used in tests are interchangeable.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait BackendApi: Send + Sync {
    async fn generate_session(&self, criteria: &SessionCriteria)
    -> Result<GenerateSessionResponse>;

    async fn get_audio_phrases(&self, language: &str, voice_id: &str) -> Result<AudioPhrases>;

    async fn validate_answer(&self, request: &ValidateAnswerRequest)
    -> Result<ValidateAnswerResponse>;

    async fn finalize_session(&self, session_id: &str) -> Result<FinalizeSessionResponse>;

    /// Deducts `amount` tokens from the account that owns the session.
    async fn charge_tokens(&self, session_id: &str, amount: u32) -> Result<()>;
}
