use thiserror::Error;

/// Everything that can go wrong while running a session.
///
/// A failed microphone acquisition or an answer that cannot be encoded skips
/// the answer. A rejected answer and a
/// transport failure while validating both lead to the question being asked
/// again. Everything else ends the session.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Missing session data: {0}")]
    MissingSessionData(String),

    #[error("Microphone unavailable: {0}")]
    CaptureAcquisition(String),

    #[error("Could not encode answer: {0}")]
    Encoding(String),

    #[error("Answer rejected: {0}")]
    ValidationFailure(String),

    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Failed to finalize session: {0}")]
    Finalize(String),

    #[error("Question {question_id} was asked again {retries} times without an accepted answer")]
    RetryLimitExceeded { question_id: String, retries: u32 },

    #[error("Session abandoned before completion")]
    Abandoned,
}
