use rethink_protocol::{ErrorCode, ErrorEnvelope, Subject};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TutorError>;

/// Public message for every upstream failure. Provider details stay in the logs.
pub const LLM_UNAVAILABLE: &str = "LLM service unavailable";

/// Broad class of a [`TutorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid field; the caller can fix the request.
    Validation,
    /// Unknown session or wrong gate state; the caller must analyze again.
    Session,
    /// Upstream completion failure.
    Provider,
    /// Upstream answered, but not with the expected JSON.
    MalformedResponse,
}

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid subject '{}'. Must be one of: {}", .0, Subject::accepted())]
    InvalidSubject(String),

    #[error("Session not found or expired")]
    InvalidSession,

    #[error("No active error context for this session. Ask the student to continue writing.")]
    NoActiveError,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl TutorError {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingField(_) | Self::InvalidSubject(_) => ErrorCategory::Validation,
            Self::InvalidSession | Self::NoActiveError => ErrorCategory::Session,
            Self::Provider(_) => ErrorCategory::Provider,
            Self::MalformedResponse(_) => ErrorCategory::MalformedResponse,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::InvalidSubject(_) => ErrorCode::InvalidSubject,
            Self::InvalidSession => ErrorCode::InvalidSession,
            Self::NoActiveError => ErrorCode::NoActiveError,
            Self::Provider(_) | Self::MalformedResponse(_) => ErrorCode::LlmError,
        }
    }

    /// Envelope safe to return to clients.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let message = match self.category() {
            ErrorCategory::Provider | ErrorCategory::MalformedResponse => {
                LLM_UNAVAILABLE.to_string()
            }
            ErrorCategory::Validation | ErrorCategory::Session => self.to_string(),
        };
        ErrorEnvelope::new(self.code(), message)
    }
}

/// Failure of a completion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("unreadable upstream response: {0}")]
    Decode(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("HTTP {status}")),
            _ => Self::Status { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_do_not_leak_details() {
        let err = TutorError::from(ProviderError::Auth("bad key sk-123".to_string()));
        let envelope = err.envelope();
        assert_eq!(envelope.code, ErrorCode::LlmError);
        assert_eq!(envelope.error, LLM_UNAVAILABLE);
        assert_eq!(err.category(), ErrorCategory::Provider);
    }

    #[test]
    fn malformed_response_maps_like_provider_error() {
        let err = TutorError::MalformedResponse("no json".to_string());
        assert_eq!(err.code(), ErrorCode::LlmError);
        assert_eq!(err.category(), ErrorCategory::MalformedResponse);
        assert_eq!(err.envelope().error, LLM_UNAVAILABLE);
    }

    #[test]
    fn validation_errors_keep_their_message() {
        let err = TutorError::InvalidSubject("history".to_string());
        let envelope = err.envelope();
        assert_eq!(envelope.code, ErrorCode::InvalidSubject);
        assert!(envelope.error.contains("writing, math, science, other"));
    }

    #[test]
    fn auth_statuses_map_to_auth_error() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(429, "slow down".to_string()),
            ProviderError::Status { status: 429, .. }
        ));
    }
}
