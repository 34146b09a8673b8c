use crate::question::Question;

/// What the candidate asked to be interviewed on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCriteria {
    pub job_name: String,

    /// Language code, ex: "en"
    pub language: String,

    pub question_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,

    /// Training sessions are not charged and use a stricter success marker.
    #[serde(default)]
    pub training: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSessionResponse {
    pub session_id: String,

    pub questions: Vec<Question>,

    /// Suggested countdown length. The client falls back to its own default when absent.
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FinalizeSessionResponse {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeTokensRequest {
    pub session_id: String,
    pub amount: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeTokensResponse {
    pub success: bool,

    #[serde(default)]
    pub remaining_tokens: Option<i64>,
}
