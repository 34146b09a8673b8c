use crate::audio::Base64EncodedAudioBytes;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    /// The prompt as read aloud.
    pub text: String,

    /// Topic tags. The first one decides whether a topic change happened.
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub soft_skill: bool,

    pub audio: Base64EncodedAudioBytes,

    /// Assigned by the backend once the session is finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Question {
    /// Primary topic tag, if the question has any.
    pub fn topic(&self) -> Option<&str> {
        self.tags.first().map(|t| t.as_str())
    }
}
