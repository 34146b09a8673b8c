use crate::backend::BackendApi;
use crate::capture::RecordingBuffer;
use crate::error::SessionError;
use crate::initializer::{PhrasePicker, pick_phrase};
use crate::segment::{FillerKind, Segment, SegmentQueue};
use interview_api_types::{Question, Utterance, ValidateAnswerRequest, ValidateAnswerResponse};
use std::collections::HashMap;
use std::sync::Arc;

/// Decides whether a validation response counts as an accepted answer.
pub trait SuccessPredicate: Send + Sync {
    fn is_success(&self, response: &ValidateAnswerResponse) -> bool;
}

/// Interview sessions trust the response's `success` flag.
pub struct InterviewPredicate;

impl SuccessPredicate for InterviewPredicate {
    fn is_success(&self, response: &ValidateAnswerResponse) -> bool {
        response.success
    }
}

/// Training sessions additionally require the "success" answer marker.
pub struct TrainingPredicate;

impl SuccessPredicate for TrainingPredicate {
    fn is_success(&self, response: &ValidateAnswerResponse) -> bool {
        response.success
            && response
                .answer_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("success"))
    }
}

/// Supplies the phrase that prefaces a question asked again.
pub trait RetryPhraseSource: Send {
    /// `None` asks the question again without a preface.
    fn next_phrase(&mut self) -> Option<Utterance>;
}

/// Draws uniformly, with replacement, from a pool of repeat-question phrases.
pub struct RepeatPool {
    phrases: Vec<Utterance>,
    picker: Box<dyn PhrasePicker>,
}

impl RepeatPool {
    pub fn new(phrases: Vec<Utterance>, picker: Box<dyn PhrasePicker>) -> Self {
        Self { phrases, picker }
    }
}

impl RetryPhraseSource for RepeatPool {
    fn next_phrase(&mut self) -> Option<Utterance> {
        pick_phrase(self.picker.as_mut(), &self.phrases).cloned()
    }
}

/// Splices a repeat segment into the queue when an answer is rejected.
pub struct RetryPolicy {
    source: Box<dyn RetryPhraseSource>,
    max_retries: Option<u32>,
    retries: HashMap<usize, u32>,
}

impl RetryPolicy {
    pub fn new(source: Box<dyn RetryPhraseSource>, max_retries: Option<u32>) -> Self {
        Self {
            source,
            max_retries,
            retries: HashMap::new(),
        }
    }

    /// How many times the question at `index` has been asked again.
    pub fn retries_for(&self, index: usize) -> u32 {
        self.retries.get(&index).copied().unwrap_or(0)
    }

    /// Inserts `{repeat phrase, question}` right after `cursor` and returns the new cursor.
    pub fn apply(
        &mut self,
        queue: &mut SegmentQueue,
        cursor: usize,
    ) -> Result<usize, SessionError> {
        let index = queue
            .get(cursor)
            .filter(|s| s.is_retry_eligible())
            .and_then(Segment::question_index)
            .ok_or_else(|| {
                SessionError::MissingSessionData(format!("segment {cursor} cannot be retried"))
            })?;
        let question = queue.questions().get(index).cloned().ok_or_else(|| {
            SessionError::MissingSessionData(format!("question {index} is not in the queue"))
        })?;

        let retries = self.retries.entry(index).or_insert(0);
        if let Some(max) = self.max_retries {
            if *retries >= max {
                return Err(SessionError::RetryLimitExceeded {
                    question_id: question.id,
                    retries: *retries,
                });
            }
        }
        *retries += 1;

        let segment = match self.source.next_phrase() {
            Some(phrase) => {
                Segment::question_with_filler(FillerKind::RepeatQuestion, phrase, index, &question)
            }
            None => Segment::question(index, &question),
        };
        let at = queue.insert_after(cursor, segment);
        tracing::info!(
            "Question {} will be asked again at position {} (retry {})",
            question.id,
            at,
            retries
        );
        Ok(at)
    }
}

/// Session-wide fields sent with every validation request.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub session_id: String,
    pub job_name: String,
    /// Tokens charged per validation call. `None` disables charging.
    pub token_cost: Option<u32>,
}

/// Encodes recorded answers and asks the backend to judge them.
pub struct AnswerSubmitter {
    backend: Arc<dyn BackendApi>,
    predicate: Box<dyn SuccessPredicate>,
    context: SubmissionContext,
}

impl AnswerSubmitter {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        predicate: Box<dyn SuccessPredicate>,
        context: SubmissionContext,
    ) -> Self {
        Self {
            backend,
            predicate,
            context,
        }
    }

    /// Submits one answer.
    ///
    /// `Ok(())` means the answer was accepted. `ValidationFailure` and
    /// `Transport` errors both mean the question should be asked again.
    /// `Encoding` means the recording itself is unusable; the backend is not called.
    pub async fn submit(
        &self,
        question: &Question,
        recording: RecordingBuffer,
    ) -> Result<(), SessionError> {
        let payload = tokio::task::spawn_blocking(move || recording.into_payload())
            .await
            .map_err(|e| SessionError::Encoding(format!("encoder task failed: {e}")))?
            .map_err(|e| SessionError::Encoding(format!("{e:#}")))?;

        if payload.is_empty() {
            tracing::warn!("Empty answer for question {}", question.id);
            return Err(SessionError::ValidationFailure("empty answer".to_string()));
        }

        let request = ValidateAnswerRequest {
            question_id: question.id.clone(),
            question: question.text.clone(),
            answer: payload,
            session_id: self.context.session_id.clone(),
            job_name: self.context.job_name.clone(),
            tag: question.topic().map(str::to_string),
            soft_skill: question.soft_skill,
        };

        tracing::debug!("Validating answer for question {}", question.id);
        let response = self.backend.validate_answer(&request).await;
        self.charge().await;

        let response =
            response.map_err(|e| SessionError::Transport(format!("validate answer: {e:#}")))?;
        if self.predicate.is_success(&response) {
            tracing::info!("Answer for question {} accepted", question.id);
            Ok(())
        } else {
            tracing::info!(
                "Answer for question {} rejected (answer type: {:?})",
                question.id,
                response.answer_type
            );
            Err(SessionError::ValidationFailure(format!(
                "question {} not answered adequately",
                question.id
            )))
        }
    }

    async fn charge(&self) {
        let Some(amount) = self.context.token_cost else {
            return;
        };
        if let Err(e) = self
            .backend
            .charge_tokens(&self.context.session_id, amount)
            .await
        {
            tracing::warn!("Failed to charge {} tokens: {:?}", amount, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendApi;
    use crate::initializer::build_segment_queue;
    use crate::initializer::tests::{FirstPicker, phrases, question};

    fn recording(samples: usize) -> RecordingBuffer {
        let mut buffer = RecordingBuffer::new(16000);
        buffer.push(&vec![0.2; samples]);
        buffer
    }

    fn context(token_cost: Option<u32>) -> SubmissionContext {
        SubmissionContext {
            session_id: "session-1".to_string(),
            job_name: "Data Engineer".to_string(),
            token_cost,
        }
    }

    #[test]
    fn test_training_predicate_needs_marker() {
        let interview = InterviewPredicate;
        let training = TrainingPredicate;
        let plain = ValidateAnswerResponse {
            success: true,
            answer_type: None,
        };
        let wrong_marker = ValidateAnswerResponse {
            success: true,
            answer_type: Some("partial".to_string()),
        };

        assert!(interview.is_success(&plain));
        assert!(!training.is_success(&plain));
        assert!(!training.is_success(&wrong_marker));
        assert!(training.is_success(&ValidateAnswerResponse::accepted()));
        assert!(!interview.is_success(&ValidateAnswerResponse::rejected()));
    }

    #[tokio::test]
    async fn test_accepted_answer_sends_question_fields_and_charges() {
        let mut backend = MockBackendApi::new();
        backend
            .expect_validate_answer()
            .withf(|req| {
                req.question_id == "q0"
                    && req.session_id == "session-1"
                    && req.job_name == "Data Engineer"
                    && req.tag.as_deref() == Some("a")
                    && !req.answer.is_empty()
            })
            .returning(|_| Box::pin(async { Ok(ValidateAnswerResponse::accepted()) }))
            .once();
        backend
            .expect_charge_tokens()
            .withf(|session_id, amount| session_id == "session-1" && *amount == 3)
            .returning(|_, _| Box::pin(async { Ok(()) }))
            .once();

        let submitter =
            AnswerSubmitter::new(Arc::new(backend), Box::new(InterviewPredicate), context(Some(3)));
        let result = submitter.submit(&question("q0", "a"), recording(800)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_answer_fails_without_backend_call() {
        let backend = MockBackendApi::new();
        let submitter =
            AnswerSubmitter::new(Arc::new(backend), Box::new(InterviewPredicate), context(Some(1)));

        let err = submitter
            .submit(&question("q0", "a"), RecordingBuffer::new(16000))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailure(_)));
    }

    #[tokio::test]
    async fn test_unencodable_answer_skips_backend() {
        let mut backend = MockBackendApi::new();
        backend.expect_validate_answer().never();
        backend.expect_charge_tokens().never();
        let submitter =
            AnswerSubmitter::new(Arc::new(backend), Box::new(InterviewPredicate), context(Some(1)));

        let mut broken = RecordingBuffer::new(0);
        broken.push(&[0.2; 100]);
        let err = submitter
            .submit(&question("q0", "a"), broken)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_transport_error_still_charges_and_asks_for_retry() {
        let mut backend = MockBackendApi::new();
        backend
            .expect_validate_answer()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connection reset")) }));
        backend
            .expect_charge_tokens()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("ledger down")) }))
            .once();

        let submitter =
            AnswerSubmitter::new(Arc::new(backend), Box::new(InterviewPredicate), context(Some(1)));
        let err = submitter
            .submit(&question("q0", "a"), recording(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_training_rejection_is_not_charged() {
        let mut backend = MockBackendApi::new();
        backend.expect_validate_answer().returning(|_| {
            Box::pin(async {
                Ok(ValidateAnswerResponse {
                    success: true,
                    answer_type: Some("incomplete".to_string()),
                })
            })
        });
        backend.expect_charge_tokens().never();

        let submitter =
            AnswerSubmitter::new(Arc::new(backend), Box::new(TrainingPredicate), context(None));
        let err = submitter
            .submit(&question("q0", "a"), recording(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ValidationFailure(_)));
    }

    #[test]
    fn test_retry_inserts_repeat_segment_after_cursor() {
        let questions = vec![question("q0", "a"), question("q1", "a")];
        let bank = phrases();
        let mut queue = build_segment_queue(questions, &bank, &mut FirstPicker).unwrap();
        let mut policy = RetryPolicy::new(
            Box::new(RepeatPool::new(
                bank.repeat_question_phrases.clone(),
                Box::new(FirstPicker),
            )),
            None,
        );

        let cursor = policy.apply(&mut queue, 1).unwrap();

        assert_eq!(cursor, 2);
        assert_eq!(queue.len(), 5);
        let repeat = queue.get(2).unwrap();
        assert_eq!(repeat.filler(), Some(FillerKind::RepeatQuestion));
        assert_eq!(repeat.entries()[0].text, "repeat 0");
        assert_eq!(repeat.question_index(), Some(0));
        assert_eq!(queue.get(3).unwrap().question_index(), Some(1));
        assert_eq!(policy.retries_for(0), 1);
    }

    #[test]
    fn test_retry_cap_stops_the_loop() {
        let bank = phrases();
        let mut queue =
            build_segment_queue(vec![question("q0", "a")], &bank, &mut FirstPicker).unwrap();
        let mut policy = RetryPolicy::new(
            Box::new(RepeatPool::new(
                bank.repeat_question_phrases.clone(),
                Box::new(FirstPicker),
            )),
            Some(2),
        );

        let cursor = policy.apply(&mut queue, 1).unwrap();
        let cursor = policy.apply(&mut queue, cursor).unwrap();
        let err = policy.apply(&mut queue, cursor).unwrap_err();

        assert!(matches!(
            err,
            SessionError::RetryLimitExceeded { retries: 2, .. }
        ));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_welcome_cannot_be_retried() {
        let bank = phrases();
        let mut queue =
            build_segment_queue(vec![question("q0", "a")], &bank, &mut FirstPicker).unwrap();
        let mut policy = RetryPolicy::new(
            Box::new(RepeatPool::new(vec![], Box::new(FirstPicker))),
            None,
        );
        assert!(policy.apply(&mut queue, 0).is_err());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_empty_repeat_pool_repeats_question_alone() {
        let bank = phrases();
        let mut queue =
            build_segment_queue(vec![question("q0", "a")], &bank, &mut FirstPicker).unwrap();
        let mut policy = RetryPolicy::new(
            Box::new(RepeatPool::new(vec![], Box::new(FirstPicker))),
            None,
        );
        let cursor = policy.apply(&mut queue, 1).unwrap();
        assert_eq!(queue.get(cursor).unwrap().entries().len(), 1);
        assert_eq!(queue.get(cursor).unwrap().filler(), None);
    }
}
