use interview_api_types::{Question, Utterance};

/// What a segment is for in the session flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Welcome,
    /// Asks the question at `index` in the session's question list.
    Question { index: usize },
    Outro,
}

/// Which pool a filler utterance was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerKind {
    Transition,
    SectionChanger,
    RepeatQuestion,
}

/// One playback unit: a single utterance, or a filler followed by a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    kind: SegmentKind,
    filler: Option<FillerKind>,
    entries: Vec<Utterance>,
}

impl Segment {
    pub fn welcome(welcome: Utterance) -> Self {
        Self {
            kind: SegmentKind::Welcome,
            filler: None,
            entries: vec![welcome],
        }
    }

    pub fn outro(outro: Utterance) -> Self {
        Self {
            kind: SegmentKind::Outro,
            filler: None,
            entries: vec![outro],
        }
    }

    pub fn question(index: usize, question: &Question) -> Self {
        Self {
            kind: SegmentKind::Question { index },
            filler: None,
            entries: vec![question_utterance(question)],
        }
    }

    pub fn question_with_filler(
        filler_kind: FillerKind,
        filler: Utterance,
        index: usize,
        question: &Question,
    ) -> Self {
        Self {
            kind: SegmentKind::Question { index },
            filler: Some(filler_kind),
            entries: vec![filler, question_utterance(question)],
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn filler(&self) -> Option<FillerKind> {
        self.filler
    }

    /// Utterances in playback order. Never empty.
    pub fn entries(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn question_index(&self) -> Option<usize> {
        match self.kind {
            SegmentKind::Question { index } => Some(index),
            _ => None,
        }
    }

    /// Only question segments can be asked again.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self.kind, SegmentKind::Question { .. })
    }
}

fn question_utterance(question: &Question) -> Utterance {
    Utterance::new(question.text.clone(), question.audio.clone())
}

/// The ordered playback plan for a session.
///
/// Grows only through [`SegmentQueue::insert_after`]; nothing is ever removed
/// until the session is finalized and the queue is cleared.
#[derive(Debug, Clone, Default)]
pub struct SegmentQueue {
    segments: Vec<Segment>,
    questions: Vec<Question>,
}

impl SegmentQueue {
    pub(crate) fn new(segments: Vec<Segment>, questions: Vec<Question>) -> Self {
        Self {
            segments,
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Segment> {
        self.segments.get(position)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question asked by the segment at `position`, if it asks one.
    pub fn question_at(&self, position: usize) -> Option<&Question> {
        self.get(position)
            .and_then(Segment::question_index)
            .and_then(|index| self.questions.get(index))
    }

    /// Splices `segment` in right after `position` and returns where it landed.
    pub fn insert_after(&mut self, position: usize, segment: Segment) -> usize {
        let at = (position + 1).min(self.segments.len());
        self.segments.insert(at, segment);
        at
    }

    /// Counts segments whose filler came from the given pool.
    pub fn filler_count(&self, kind: FillerKind) -> usize {
        self.segments
            .iter()
            .filter(|s| s.filler == Some(kind))
            .count()
    }

    pub(crate) fn clear(&mut self) {
        self.segments.clear();
    }
}
