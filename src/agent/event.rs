use std::sync::Arc;

use strum::Display;

use crate::error::EngineError;
use crate::types::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AgentEventKind {
    Response,
    Error,
    Summarize,
}

/// Lifecycle event published to subscribers and delivered on a run's stream.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    pub kind: AgentEventKind,
    pub session_id: String,
    pub message: Option<Message>,
    pub error: Option<Arc<EngineError>>,
    pub progress: Option<String>,
    pub done: bool,
}

impl AgentEvent {
    fn new(kind: AgentEventKind, session_id: impl Into<String>) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
            message: None,
            error: None,
            progress: None,
            done: false,
        }
    }

    /// Terminal success of a run.
    pub fn response(session_id: impl Into<String>, message: Message) -> Self {
        Self {
            message: Some(message),
            done: true,
            ..Self::new(AgentEventKind::Response, session_id)
        }
    }

    /// Terminal failure of a run.
    pub fn error(session_id: impl Into<String>, error: EngineError) -> Self {
        Self {
            error: Some(Arc::new(error)),
            done: true,
            ..Self::new(AgentEventKind::Error, session_id)
        }
    }

    pub fn summarize_progress(session_id: impl Into<String>, progress: impl Into<String>) -> Self {
        Self {
            progress: Some(progress.into()),
            ..Self::new(AgentEventKind::Summarize, session_id)
        }
    }

    pub fn summarize_done(session_id: impl Into<String>, progress: impl Into<String>) -> Self {
        Self {
            done: true,
            ..Self::summarize_progress(session_id, progress)
        }
    }

    /// Terminal failure of a summarization. Reported as an `Error` event.
    pub fn summarize_error(session_id: impl Into<String>, error: EngineError) -> Self {
        Self::error(session_id, error)
    }

    /// Whether the run ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.error.as_deref().is_some_and(EngineError::is_cancellation)
    }
}
