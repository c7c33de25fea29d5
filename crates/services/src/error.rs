//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::gate::GateError;
use quiz_core::progression::ProgressionError;

/// Errors from a `QuizApi` call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("grading service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("session is not known to the grading service")]
    SessionExpired,
    #[error("grading service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors building clients from configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid grading service url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Errors emitted by the session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no active session")]
    SessionNotFound,
    #[error("network failure: {0}")]
    Network(#[source] ApiError),
    #[error("answer rejected: {0}")]
    ValidationRejected(#[from] GateError),
    #[error("session already completed")]
    AlreadyCompleted,
    #[error("no question is ready")]
    NoQuestion,
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

impl SessionError {
    /// Whether resubmitting the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Network(_) | SessionError::NoQuestion)
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::SessionExpired => SessionError::SessionNotFound,
            other => SessionError::Network(other),
        }
    }
}
