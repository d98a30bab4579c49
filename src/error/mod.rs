//! Error types for the engine.

use thiserror::Error;

use crate::store::StoreError;

/// Primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("session {0} is currently processing another request")]
    SessionBusy(String),

    #[error("request cancelled by user")]
    RequestCancelled,

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Augmentation error: {0}")]
    Augmentation(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Provider error: {provider} — {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("summarize provider not available")]
    SummarizerUnavailable,

    #[error("no messages to summarize")]
    NoMessagesToSummarize,

    #[error("empty summary returned")]
    EmptySummary,

    #[error("{context}: {source}")]
    Run {
        context: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("{0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with a short context prefix.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Run {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or anything it wraps) is a user cancellation.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::RequestCancelled => true,
            Self::Run { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_detected_through_context() {
        let err = EngineError::RequestCancelled.context("failed to process events");
        assert!(err.is_cancellation());
        assert_eq!(
            err.to_string(),
            "failed to process events: request cancelled by user"
        );
    }

    #[test]
    fn stream_error_is_not_cancellation() {
        assert!(!EngineError::Stream("boom".into()).is_cancellation());
    }

    #[test]
    fn tool_errors_are_not_cancellation() {
        assert!(!EngineError::PermissionDenied.is_cancellation());
        let err = EngineError::ToolNotFound("grep".into());
        assert!(!err.is_cancellation());
        assert_eq!(err.to_string(), "tool not found: grep");
    }

    #[test]
    fn store_error_converts_into_persistence() {
        let err: EngineError = StoreError::NotFound("message m1".into()).into();
        assert!(matches!(err, EngineError::Persistence(_)));
    }
}
