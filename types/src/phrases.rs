use crate::audio::Utterance;

/// Phrase bank served for a given language and voice.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPhrases {
    /// Played once before the first question.
    pub welcome: Utterance,

    /// Played once after the last question.
    pub outro: Utterance,

    /// Fillers between two questions sharing a topic.
    #[serde(default)]
    pub transition_phrases: Vec<Utterance>,

    /// Fillers used when the topic changes between two questions.
    #[serde(default)]
    pub section_changer_phrases: Vec<Utterance>,

    /// Fillers that preface a question asked again.
    #[serde(default)]
    pub repeat_question_phrases: Vec<Utterance>,
}
