pub mod backend;
pub mod capture;
pub mod error;
pub mod finalizer;
pub mod initializer;
pub mod renderer;
pub mod segment;
pub mod session_state;
pub mod submitter;
pub mod timer;

pub use error::SessionError;
pub use session_state::{
    Collaborators, OrchestratorConfig, SessionMode, SessionOrchestrator, SessionSnapshot,
    SessionState, SessionStats,
};

use segment::SegmentKind;

/// Signals the surrounding page sends to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The candidate finished answering.
    StopRecording,
    /// The page is going away. The session stops without telling the backend.
    Abandon,
}

/// Notifications a running session sends to the surrounding page.
///
/// A rejected answer is reported as `AnswerRejected` for bookkeeping only; to
/// the candidate it looks like any other transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SegmentStarted { cursor: usize, kind: SegmentKind },
    CaptureStarted { cursor: usize },
    CaptureSkipped { cursor: usize, reason: String },
    AnswerAccepted { question_id: String },
    AnswerRejected { question_id: String, retry_at: usize },
    Completed,
    Failed(String),
}
