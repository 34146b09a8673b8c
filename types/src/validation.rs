use crate::audio::Base64EncodedAudioBytes;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAnswerRequest {
    pub question_id: String,

    /// Prompt text of the question being answered.
    pub question: String,

    /// The recorded answer, base64 encoded WAV.
    pub answer: Base64EncodedAudioBytes,

    pub session_id: String,

    pub job_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    pub soft_skill: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAnswerResponse {
    pub success: bool,

    /// Training sessions mark an accepted answer with "success".
    #[serde(default)]
    pub answer_type: Option<String>,
}

impl ValidateAnswerResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            answer_type: Some("success".to_string()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            success: false,
            answer_type: None,
        }
    }
}
