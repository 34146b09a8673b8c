use crate::error::SessionError;
use crate::segment::{FillerKind, Segment, SegmentQueue};
use interview_api_types::{AudioPhrases, Question, Utterance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The phrase bank a session is built from.
pub type PhraseBank = AudioPhrases;

/// Chooses one element out of a phrase pool.
///
/// Picks are uniform and with replacement, so the same filler can come up
/// more than once in a session.
pub trait PhrasePicker: Send {
    /// Returns an index in `0..pool_len`. `pool_len` is never zero.
    fn pick_index(&mut self, pool_len: usize) -> usize;
}

pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhrasePicker for RandomPicker {
    fn pick_index(&mut self, pool_len: usize) -> usize {
        self.rng.gen_range(0..pool_len)
    }
}

/// Picks a phrase out of `pool`, or `None` when the pool is empty.
pub fn pick_phrase<'a>(
    picker: &mut dyn PhrasePicker,
    pool: &'a [Utterance],
) -> Option<&'a Utterance> {
    if pool.is_empty() {
        return None;
    }
    pool.get(picker.pick_index(pool.len()))
}

/// Builds the initial playback plan:
/// welcome, the first question on its own, every later question behind a
/// filler, then the outro.
///
/// A filler comes from the section-changer pool when the question's topic
/// differs from the previous question's, and from the transition pool otherwise.
pub fn build_segment_queue(
    questions: Vec<Question>,
    phrases: &PhraseBank,
    picker: &mut dyn PhrasePicker,
) -> Result<SegmentQueue, SessionError> {
    check_inputs(&questions, phrases)?;

    let mut segments = Vec::with_capacity(questions.len() + 2);
    segments.push(Segment::welcome(phrases.welcome.clone()));
    segments.push(Segment::question(0, &questions[0]));

    for (index, pair) in questions.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let (kind, pool) = if current.topic() != previous.topic() {
            (FillerKind::SectionChanger, &phrases.section_changer_phrases)
        } else {
            (FillerKind::Transition, &phrases.transition_phrases)
        };
        let filler = pick_phrase(picker, pool)
            .cloned()
            .ok_or_else(|| SessionError::MissingSessionData(format!("{kind:?} phrases")))?;
        segments.push(Segment::question_with_filler(
            kind,
            filler,
            index + 1,
            current,
        ));
    }

    segments.push(Segment::outro(phrases.outro.clone()));

    tracing::info!(
        "Built segment queue: {} questions, {} segments",
        questions.len(),
        segments.len()
    );
    Ok(SegmentQueue::new(segments, questions))
}

fn check_inputs(questions: &[Question], phrases: &PhraseBank) -> Result<(), SessionError> {
    let missing = |what: &str| Err(SessionError::MissingSessionData(what.to_string()));

    if questions.is_empty() {
        return missing("questions");
    }
    if let Some(q) = questions
        .iter()
        .find(|q| q.text.trim().is_empty() || q.audio.is_empty())
    {
        return Err(SessionError::MissingSessionData(format!(
            "question {} has no text or audio",
            q.id
        )));
    }
    if phrases.welcome.is_empty() {
        return missing("welcome phrase");
    }
    if phrases.outro.is_empty() {
        return missing("outro phrase");
    }
    if phrases.transition_phrases.is_empty() {
        return missing("transition phrases");
    }
    if phrases.section_changer_phrases.is_empty() {
        return missing("section changer phrases");
    }
    if phrases.repeat_question_phrases.is_empty() {
        return missing("repeat question phrases");
    }
    Ok(())
}
