use crate::backend::BackendApi;
use crate::error::SessionError;
use std::sync::Arc;

/// Closes a session on the backend. Runs at most once.
pub struct Finalizer {
    backend: Arc<dyn BackendApi>,
    session_id: String,
    invoked: bool,
}

impl Finalizer {
    pub fn new(backend: Arc<dyn BackendApi>, session_id: String) -> Self {
        Self {
            backend,
            session_id,
            invoked: false,
        }
    }

    pub fn is_invoked(&self) -> bool {
        self.invoked
    }

    /// Calls the finalize endpoint. Any failure is final: there is no retry
    /// and answers already submitted stay submitted.
    pub async fn finalize(&mut self) -> Result<(), SessionError> {
        if self.invoked {
            return Err(SessionError::Finalize(format!(
                "session {} was already finalized",
                self.session_id
            )));
        }
        self.invoked = true;

        tracing::info!("Finalizing session {}", self.session_id);
        let response = self
            .backend
            .finalize_session(&self.session_id)
            .await
            .map_err(|e| SessionError::Transport(format!("finalize session: {e:#}")))?;

        if response.success {
            tracing::info!("Session {} finalized", self.session_id);
            Ok(())
        } else {
            let reason = response
                .message
                .unwrap_or_else(|| "backend reported failure".to_string());
            tracing::error!("Session {} could not be finalized: {}", self.session_id, reason);
            Err(SessionError::Finalize(reason))
        }
    }
}
