/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// A spoken line paired with its pre-rendered audio.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Utterance {
    /// What the avatar says.
    pub text: String,

    /// Encoded audio for `text`. Opaque to everything except the renderer.
    pub audio: Base64EncodedAudioBytes,
}

impl Utterance {
    pub fn new(text: impl Into<String>, audio: impl Into<Base64EncodedAudioBytes>) -> Self {
        Self {
            text: text.into(),
            audio: audio.into(),
        }
    }

    /// An utterance with no text or no audio cannot be played.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() || self.audio.is_empty()
    }
}
