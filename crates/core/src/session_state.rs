use crate::backend::BackendApi;
use crate::capture::{CaptureController, MicrophoneSource, RecordingBuffer};
use crate::error::SessionError;
use crate::finalizer::Finalizer;
use crate::renderer::AvatarRenderer;
use crate::segment::{Segment, SegmentKind, SegmentQueue};
use crate::submitter::{
    AnswerSubmitter, InterviewPredicate, RetryPhraseSource, RetryPolicy, SubmissionContext,
    SuccessPredicate, TrainingPredicate,
};
use crate::{Input, SessionEvent};
use interview_utils::audio::ANSWER_SAMPLE_RATE;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};

/// Where a session is. The position carried by each variant is the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingWelcome,
    PlayingSegment(usize),
    /// The question at this position has been asked; the candidate is answering.
    AwaitingCapture(usize),
    Validating(usize),
    Completed,
    /// A fatal error was surfaced. Queue and cursor are left as they were.
    Failed,
}

impl SessionState {
    pub fn cursor(&self) -> Option<usize> {
        match *self {
            SessionState::PlayingSegment(i)
            | SessionState::AwaitingCapture(i)
            | SessionState::Validating(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, SessionState::Validating(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// What the surrounding page gets to see.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub cursor: usize,
    pub queue_len: usize,
    pub is_recording: bool,
    pub is_validating: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub segments_played: u32,
    pub cursor_advances: u32,
    pub retries: u32,
    pub submissions: u32,
    pub accepted: u32,
    pub capture_skips: u32,
    /// Queue length when the outro finished playing.
    pub segments_total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interview,
    Training,
}

impl SessionMode {
    pub fn success_predicate(&self) -> Box<dyn SuccessPredicate> {
        match self {
            SessionMode::Interview => Box::new(InterviewPredicate),
            SessionMode::Training => Box::new(TrainingPredicate),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub session_id: String,
    pub job_name: String,
    pub mode: SessionMode,
    /// Charged per validation call in interview mode.
    pub token_cost: u32,
    /// `None` keeps asking a question until it is answered.
    pub max_retries_per_question: Option<u32>,
}

impl OrchestratorConfig {
    pub fn new(
        session_id: impl Into<String>,
        job_name: impl Into<String>,
        mode: SessionMode,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            job_name: job_name.into(),
            mode,
            token_cost: 1,
            max_retries_per_question: None,
        }
    }

    pub fn with_token_cost(mut self, token_cost: u32) -> Self {
        self.token_cost = token_cost;
        self
    }

    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries_per_question = max_retries;
        self
    }
}

/// External services a session is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub backend: Arc<dyn BackendApi>,
    pub renderer: Arc<dyn AvatarRenderer>,
    pub microphone: Arc<dyn MicrophoneSource>,
}

/// Drives one session from the welcome to the outro.
///
/// Everything happens on the task that calls [`SessionOrchestrator::run`]:
/// one segment plays at a time, one capture is open at a time and one
/// validation is in flight at a time.
pub struct SessionOrchestrator {
    state: SessionState,
    queue: SegmentQueue,
    cursor: usize,
    renderer: Arc<dyn AvatarRenderer>,
    capture: CaptureController,
    answer: Option<RecordingBuffer>,
    submitter: AnswerSubmitter,
    retry: RetryPolicy,
    finalizer: Finalizer,
    inputs: mpsc::Receiver<Input>,
    events: Option<mpsc::Sender<SessionEvent>>,
    snapshot: watch::Sender<SessionSnapshot>,
    stats: SessionStats,
    failure: Option<SessionError>,
}

impl SessionOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        queue: SegmentQueue,
        collaborators: Collaborators,
        retry_source: Box<dyn RetryPhraseSource>,
        inputs: mpsc::Receiver<Input>,
    ) -> Self {
        let token_cost = match config.mode {
            SessionMode::Interview => Some(config.token_cost),
            SessionMode::Training => None,
        };
        let submitter = AnswerSubmitter::new(
            collaborators.backend.clone(),
            config.mode.success_predicate(),
            SubmissionContext {
                session_id: config.session_id.clone(),
                job_name: config.job_name.clone(),
                token_cost,
            },
        );
        let (snapshot, _) = watch::channel(SessionSnapshot {
            state: SessionState::AwaitingWelcome,
            cursor: 0,
            queue_len: queue.len(),
            is_recording: false,
            is_validating: false,
        });

        Self {
            state: SessionState::AwaitingWelcome,
            queue,
            cursor: 0,
            renderer: collaborators.renderer,
            capture: CaptureController::new(collaborators.microphone),
            answer: None,
            submitter,
            retry: RetryPolicy::new(retry_source, config.max_retries_per_question),
            finalizer: Finalizer::new(collaborators.backend, config.session_id),
            inputs,
            events: None,
            snapshot,
            stats: SessionStats::default(),
            failure: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn queue(&self) -> &SegmentQueue {
        &self.queue
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Runs the session until the outro has been finalized or a fatal error occurs.
    pub async fn run(&mut self) -> Result<SessionStats, SessionError> {
        while !self.state.is_terminal() {
            match self.state {
                SessionState::AwaitingWelcome => self.set_state(SessionState::PlayingSegment(0)),
                SessionState::PlayingSegment(position) => self.play_segment(position).await?,
                SessionState::AwaitingCapture(position) => self.capture_answer(position).await?,
                SessionState::Validating(position) => self.validate_answer(position).await?,
                SessionState::Completed | SessionState::Failed => {}
            }
        }
        match self.state {
            SessionState::Completed => Ok(self.stats.clone()),
            _ => Err(self.failure.clone().unwrap_or(SessionError::Abandoned)),
        }
    }

    async fn play_segment(&mut self, position: usize) -> Result<(), SessionError> {
        let Some(kind) = self.queue.get(position).map(Segment::kind) else {
            return Err(self.fail(SessionError::MissingSessionData(format!(
                "no segment at position {position}"
            ))));
        };
        tracing::info!("Playing segment {} ({:?})", position, kind);
        self.emit(SessionEvent::SegmentStarted {
            cursor: position,
            kind,
        });

        let finished = {
            let segment = &self.queue.segments()[position];
            let mut play = self.renderer.play(segment);
            loop {
                tokio::select! {
                    result = &mut play => break Some(result),
                    input = self.inputs.recv() => match input {
                        Some(Input::StopRecording) => {
                            tracing::debug!("Not recording, ignoring stop");
                        }
                        Some(Input::Abandon) | None => break None,
                    },
                }
            }
        };

        match finished {
            None => return Err(self.abandon()),
            Some(Err(e)) => {
                tracing::warn!("Renderer failed on segment {}: {:?}", position, e);
            }
            Some(Ok(())) => {}
        }
        self.stats.segments_played += 1;

        match kind {
            SegmentKind::Outro => self.finish().await,
            SegmentKind::Question { .. } => {
                self.set_state(SessionState::AwaitingCapture(position));
                Ok(())
            }
            SegmentKind::Welcome => {
                self.advance_from(position);
                Ok(())
            }
        }
    }

    async fn capture_answer(&mut self, position: usize) -> Result<(), SessionError> {
        self.discard_stale_inputs()?;
        if let Err(e) = self.capture.start().await {
            tracing::warn!("Skipping answer for segment {}: {}", position, e);
            self.stats.capture_skips += 1;
            self.emit(SessionEvent::CaptureSkipped {
                cursor: position,
                reason: e.to_string(),
            });
            self.advance_from(position);
            return Ok(());
        }
        self.emit(SessionEvent::CaptureStarted { cursor: position });
        self.publish();

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(Input::StopRecording) => break,
                    Some(Input::Abandon) | None => return Err(self.abandon()),
                },
                _ = self.capture.next_chunk() => {}
            }
        }

        self.answer = Some(
            self.capture
                .stop()
                .unwrap_or_else(|| RecordingBuffer::new(ANSWER_SAMPLE_RATE)),
        );
        self.set_state(SessionState::Validating(position));
        Ok(())
    }

    /// Drops stops sent before this capture opened. They belong to no recording.
    fn discard_stale_inputs(&mut self) -> Result<(), SessionError> {
        loop {
            match self.inputs.try_recv() {
                Ok(Input::StopRecording) => {
                    tracing::debug!("Discarding stop sent before recording started");
                }
                Ok(Input::Abandon) | Err(TryRecvError::Disconnected) => {
                    return Err(self.abandon());
                }
                Err(TryRecvError::Empty) => return Ok(()),
            }
        }
    }

    async fn validate_answer(&mut self, position: usize) -> Result<(), SessionError> {
        let recording = self
            .answer
            .take()
            .unwrap_or_else(|| RecordingBuffer::new(ANSWER_SAMPLE_RATE));

        let outcome = match self.queue.question_at(position) {
            Some(question) => (
                question.id.clone(),
                self.submitter.submit(question, recording).await,
            ),
            None => {
                return Err(self.fail(SessionError::MissingSessionData(format!(
                    "segment {position} does not ask a question"
                ))));
            }
        };
        self.stats.submissions += 1;

        match outcome {
            (question_id, Ok(())) => {
                self.stats.accepted += 1;
                self.emit(SessionEvent::AnswerAccepted { question_id });
                self.advance_from(position);
                Ok(())
            }
            (question_id, Err(SessionError::Encoding(reason))) => {
                tracing::error!("Skipping answer to question {}: {}", question_id, reason);
                self.stats.capture_skips += 1;
                self.emit(SessionEvent::CaptureSkipped {
                    cursor: position,
                    reason,
                });
                self.advance_from(position);
                Ok(())
            }
            (question_id, Err(e)) => {
                tracing::info!("Asking question {} again: {}", question_id, e);
                match self.retry.apply(&mut self.queue, position) {
                    Ok(retry_at) => {
                        self.stats.retries += 1;
                        self.emit(SessionEvent::AnswerRejected {
                            question_id,
                            retry_at,
                        });
                        self.set_state(SessionState::PlayingSegment(retry_at));
                        Ok(())
                    }
                    Err(e) => Err(self.fail(e)),
                }
            }
        }
    }

    async fn finish(&mut self) -> Result<(), SessionError> {
        match self.finalizer.finalize().await {
            Ok(()) => {
                self.stats.segments_total = self.queue.len();
                self.queue.clear();
                self.set_state(SessionState::Completed);
                self.emit(SessionEvent::Completed);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn advance_from(&mut self, position: usize) {
        self.stats.cursor_advances += 1;
        self.set_state(SessionState::PlayingSegment(position + 1));
    }

    fn abandon(&mut self) -> SessionError {
        if self.capture.stop().is_some() {
            tracing::debug!("Discarded unfinished recording");
        }
        tracing::warn!("Session abandoned at segment {}", self.cursor);
        self.fail(SessionError::Abandoned)
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        tracing::error!("Session failed: {}", error);
        self.failure = Some(error.clone());
        self.set_state(SessionState::Failed);
        self.emit(SessionEvent::Failed(error.to_string()));
        error
    }

    fn set_state(&mut self, state: SessionState) {
        tracing::debug!("State {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some(cursor) = state.cursor() {
            self.cursor = cursor;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            state: self.state,
            cursor: self.cursor,
            queue_len: self.queue.len(),
            is_recording: self.capture.is_recording(),
            is_validating: self.state.is_validating(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.try_send(event) {
                tracing::warn!("Failed to send session event: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::ScriptedMicrophone;
    use crate::initializer::build_segment_queue;
    use crate::initializer::tests::{FirstPicker, phrases, question};
    use crate::submitter::RepeatPool;
    use async_trait::async_trait;
    use interview_api_types::{
        AudioPhrases, FinalizeSessionResponse, GenerateSessionResponse, Question, SessionCriteria,
        ValidateAnswerRequest, ValidateAnswerResponse,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct StubBackend {
        reject_once: Mutex<Vec<String>>,
        reject_all: bool,
        finalize_fails: bool,
        stray_stop: Mutex<Option<mpsc::Sender<Input>>>,
        validations: Mutex<Vec<String>>,
        payload_lens: Mutex<Vec<usize>>,
        charges: AtomicUsize,
        finalizations: AtomicUsize,
    }

    impl StubBackend {
        fn rejecting_once(ids: &[&str]) -> Self {
            Self {
                reject_once: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
                ..Default::default()
            }
        }

        fn validated(&self) -> Vec<String> {
            self.validations.lock().unwrap().clone()
        }

        /// Sends a stop in the middle of every validation call.
        fn stop_while_validating(&self, inputs: mpsc::Sender<Input>) {
            *self.stray_stop.lock().unwrap() = Some(inputs);
        }
    }

    #[async_trait]
    impl BackendApi for StubBackend {
        async fn generate_session(
            &self,
            _criteria: &SessionCriteria,
        ) -> anyhow::Result<GenerateSessionResponse> {
            anyhow::bail!("not used")
        }

        async fn get_audio_phrases(
            &self,
            _language: &str,
            _voice_id: &str,
        ) -> anyhow::Result<AudioPhrases> {
            anyhow::bail!("not used")
        }

        async fn validate_answer(
            &self,
            request: &ValidateAnswerRequest,
        ) -> anyhow::Result<ValidateAnswerResponse> {
            self.validations
                .lock()
                .unwrap()
                .push(request.question_id.clone());
            self.payload_lens.lock().unwrap().push(request.answer.len());
            if let Some(inputs) = self.stray_stop.lock().unwrap().as_ref() {
                let _ = inputs.try_send(Input::StopRecording);
            }
            let mut reject_once = self.reject_once.lock().unwrap();
            if self.reject_all {
                return Ok(ValidateAnswerResponse::rejected());
            }
            if let Some(pos) = reject_once.iter().position(|id| *id == request.question_id) {
                reject_once.remove(pos);
                return Ok(ValidateAnswerResponse::rejected());
            }
            Ok(ValidateAnswerResponse::accepted())
        }

        async fn finalize_session(
            &self,
            _session_id: &str,
        ) -> anyhow::Result<FinalizeSessionResponse> {
            self.finalizations.fetch_add(1, Ordering::SeqCst);
            if self.finalize_fails {
                return Ok(FinalizeSessionResponse {
                    success: false,
                    message: Some("session expired".to_string()),
                });
            }
            Ok(FinalizeSessionResponse {
                success: true,
                message: None,
            })
        }

        async fn charge_tokens(&self, _session_id: &str, _amount: u32) -> anyhow::Result<()> {
            self.charges.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Finishes every segment straight away and remembers what it played.
    #[derive(Default)]
    struct RecordingRenderer {
        played: Mutex<Vec<Vec<String>>>,
        stray_stop: Mutex<Option<mpsc::Sender<Input>>>,
    }

    impl RecordingRenderer {
        fn played(&self) -> Vec<Vec<String>> {
            self.played.lock().unwrap().clone()
        }

        /// Sends a stop as each segment's audio ends, before anything records.
        fn stop_after_each_segment(&self, inputs: mpsc::Sender<Input>) {
            *self.stray_stop.lock().unwrap() = Some(inputs);
        }
    }

    #[async_trait]
    impl AvatarRenderer for RecordingRenderer {
        async fn play(&self, segment: &Segment) -> anyhow::Result<()> {
            let texts = segment.entries().iter().map(|e| e.text.clone()).collect();
            self.played.lock().unwrap().push(texts);
            if let Some(inputs) = self.stray_stop.lock().unwrap().as_ref() {
                let _ = inputs.try_send(Input::StopRecording);
            }
            Ok(())
        }
    }

    /// Sends `action` every time a recording starts.
    fn candidate(
        mut snapshots: watch::Receiver<SessionSnapshot>,
        inputs: mpsc::Sender<Input>,
        action: Input,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let recording = snapshots.borrow_and_update().is_recording;
                if recording && inputs.send(action.clone()).await.is_err() {
                    return;
                }
                if snapshots.changed().await.is_err() {
                    return;
                }
            }
        })
    }

    struct Harness {
        orchestrator: SessionOrchestrator,
        backend: Arc<StubBackend>,
        renderer: Arc<RecordingRenderer>,
        microphone: Arc<ScriptedMicrophone>,
        inputs: mpsc::Sender<Input>,
        _candidate: JoinHandle<()>,
    }

    fn harness(
        questions: Vec<Question>,
        backend: StubBackend,
        microphone: ScriptedMicrophone,
        config: OrchestratorConfig,
        action: Input,
    ) -> Harness {
        let bank = phrases();
        let queue = build_segment_queue(questions, &bank, &mut FirstPicker).unwrap();
        let backend = Arc::new(backend);
        let renderer = Arc::new(RecordingRenderer::default());
        let microphone = Arc::new(microphone);
        let (tx, rx) = mpsc::channel(8);

        let orchestrator = SessionOrchestrator::new(
            config,
            queue,
            Collaborators {
                backend: backend.clone(),
                renderer: renderer.clone(),
                microphone: microphone.clone(),
            },
            Box::new(RepeatPool::new(
                bank.repeat_question_phrases.clone(),
                Box::new(FirstPicker),
            )),
            rx,
        );
        let candidate = candidate(orchestrator.subscribe(), tx.clone(), action);

        Harness {
            orchestrator,
            backend,
            renderer,
            microphone,
            inputs: tx,
            _candidate: candidate,
        }
    }

    fn interview() -> OrchestratorConfig {
        OrchestratorConfig::new("session-1", "Data Engineer", SessionMode::Interview)
    }

    fn same_topic(n: usize) -> Vec<Question> {
        (0..n).map(|i| question(&format!("q{i}"), "a")).collect()
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_accepted_answers_walk_the_queue_once() {
        let mut h = harness(
            same_topic(3),
            StubBackend::default(),
            ScriptedMicrophone::default(),
            interview(),
            Input::StopRecording,
        );

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(h.orchestrator.state(), SessionState::Completed);
        assert_eq!(stats.cursor_advances, 4);
        assert_eq!(stats.retries, 0);
        assert_eq!(stats.segments_played, 5);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.segments_total, 5);
        assert!(h.orchestrator.queue().is_empty());

        let played = h.renderer.played();
        assert_eq!(played.len(), 5);
        assert_eq!(played[0], texts(&["Welcome"]));
        assert_eq!(played[1], texts(&["What about q0?"]));
        assert_eq!(played[2], texts(&["transition 0", "What about q1?"]));
        assert_eq!(played[4], texts(&["Thanks"]));

        assert_eq!(h.backend.validated(), texts(&["q0", "q1", "q2"]));
        assert_eq!(h.backend.charges.load(Ordering::SeqCst), 3);
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 1);
        assert_eq!(h.microphone.released.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_answer_asks_again_before_moving_on() {
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let mut h = harness(
            same_topic(3),
            StubBackend::rejecting_once(&["q1"]),
            ScriptedMicrophone::default(),
            interview(),
            Input::StopRecording,
        );
        h.orchestrator = h.orchestrator.with_events(events_tx);

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.retries, 1);
        assert_eq!(stats.cursor_advances, 4);
        assert_eq!(stats.segments_total, 6);
        assert_eq!(
            h.renderer.played(),
            vec![
                texts(&["Welcome"]),
                texts(&["What about q0?"]),
                texts(&["transition 0", "What about q1?"]),
                texts(&["repeat 0", "What about q1?"]),
                texts(&["transition 0", "What about q2?"]),
                texts(&["Thanks"]),
            ]
        );
        assert_eq!(h.backend.validated(), texts(&["q0", "q1", "q1", "q2"]));

        let mut events = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&SessionEvent::AnswerRejected {
            question_id: "q1".to_string(),
            retry_at: 3,
        }));
        assert_eq!(events.last(), Some(&SessionEvent::Completed));
    }

    #[tokio::test]
    async fn test_empty_answer_is_asked_again_without_validation() {
        let mut h = harness(
            same_topic(1),
            StubBackend::default(),
            ScriptedMicrophone::with_answers(vec![vec![]]),
            interview(),
            Input::StopRecording,
        );

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.retries, 1);
        assert_eq!(stats.submissions, 2);
        assert_eq!(h.backend.validated(), texts(&["q0"]));
        assert_eq!(
            h.renderer.played(),
            vec![
                texts(&["Welcome"]),
                texts(&["What about q0?"]),
                texts(&["repeat 0", "What about q0?"]),
                texts(&["Thanks"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_finalize_failure_leaves_session_in_place() {
        let backend = StubBackend {
            finalize_fails: true,
            ..Default::default()
        };
        let mut h = harness(
            same_topic(1),
            backend,
            ScriptedMicrophone::default(),
            interview(),
            Input::StopRecording,
        );

        let err = h.orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SessionError::Finalize(ref reason) if reason == "session expired"));
        assert_eq!(h.orchestrator.state(), SessionState::Failed);
        assert_eq!(h.orchestrator.queue().len(), 3);
        assert_eq!(h.orchestrator.cursor(), 2);
        assert_eq!(h.renderer.played().len(), 3);

        // A failed session stays failed.
        assert!(h.orchestrator.run().await.is_err());
        assert_eq!(h.renderer.played().len(), 3);
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_microphone_skips_answers() {
        let mut h = harness(
            same_topic(2),
            StubBackend::default(),
            ScriptedMicrophone::unavailable(),
            interview(),
            Input::StopRecording,
        );

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.capture_skips, 2);
        assert_eq!(stats.cursor_advances, 3);
        assert_eq!(stats.submissions, 0);
        assert!(h.backend.validated().is_empty());
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandon_releases_microphone_without_finalizing() {
        let mut h = harness(
            same_topic(2),
            StubBackend::default(),
            ScriptedMicrophone::default(),
            interview(),
            Input::Abandon,
        );

        let err = h.orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SessionError::Abandoned));
        assert_eq!(h.orchestrator.state(), SessionState::Failed);
        assert_eq!(h.orchestrator.cursor(), 1);
        assert_eq!(h.microphone.released.load(Ordering::SeqCst), 1);
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 0);
        assert!(!h.orchestrator.subscribe().borrow().is_recording);
    }

    #[tokio::test]
    async fn test_training_retry_cap_ends_session() {
        let backend = StubBackend {
            reject_all: true,
            ..Default::default()
        };
        let config = OrchestratorConfig::new("session-1", "Data Engineer", SessionMode::Training)
            .with_max_retries(Some(1));
        let mut h = harness(
            same_topic(1),
            backend,
            ScriptedMicrophone::default(),
            config,
            Input::StopRecording,
        );

        let err = h.orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::RetryLimitExceeded { ref question_id, retries: 1 } if question_id == "q0"
        ));
        assert_eq!(h.backend.validated(), texts(&["q0", "q0"]));
        assert_eq!(h.backend.charges.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_sent_before_recording_is_discarded() {
        let config = interview().with_max_retries(Some(3));
        let mut h = harness(
            same_topic(1),
            StubBackend::default(),
            ScriptedMicrophone::default(),
            config,
            Input::StopRecording,
        );
        h.renderer.stop_after_each_segment(h.inputs.clone());

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.retries, 0);
        assert_eq!(stats.accepted, 1);
        assert_eq!(h.backend.validated(), texts(&["q0"]));
        assert!(h.backend.payload_lens.lock().unwrap().iter().all(|len| *len > 0));
    }

    #[tokio::test]
    async fn test_stray_stops_never_cut_an_answer_short() {
        let mut h = harness(
            vec![question("q0", "a"), question("q1", "b"), question("q2", "b")],
            StubBackend::default(),
            ScriptedMicrophone::default(),
            interview(),
            Input::StopRecording,
        );
        h.renderer.stop_after_each_segment(h.inputs.clone());
        h.backend.stop_while_validating(h.inputs.clone());

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.retries, 0);
        assert_eq!(stats.accepted, 3);
        assert_eq!(h.renderer.played().len(), 5);
        assert_eq!(h.backend.validated(), texts(&["q0", "q1", "q2"]));
        let lens = h.backend.payload_lens.lock().unwrap().clone();
        assert_eq!(lens.len(), 3);
        assert!(lens.iter().all(|len| *len > 0));
    }

    #[tokio::test]
    async fn test_abandon_before_recording_stops_session() {
        let mut h = harness(
            same_topic(1),
            StubBackend::default(),
            ScriptedMicrophone::default(),
            interview(),
            Input::StopRecording,
        );
        h.inputs.try_send(Input::Abandon).unwrap();

        let err = h.orchestrator.run().await.unwrap_err();

        assert!(matches!(err, SessionError::Abandoned));
        assert_eq!(h.microphone.acquired.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unencodable_answer_is_skipped() {
        let mut h = harness(
            same_topic(2),
            StubBackend::default(),
            ScriptedMicrophone::with_sample_rate(0),
            interview(),
            Input::StopRecording,
        );

        let stats = h.orchestrator.run().await.unwrap();

        assert_eq!(stats.capture_skips, 2);
        assert_eq!(stats.retries, 0);
        assert_eq!(stats.cursor_advances, 3);
        assert!(h.backend.validated().is_empty());
        assert_eq!(h.backend.finalizations.load(Ordering::SeqCst), 1);
    }
}
