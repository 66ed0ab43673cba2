use rethink_protocol::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("document source failed: {0}")]
    Source(String),

    /// The backend answered with an error envelope.
    #[error("{message}")]
    Api { code: ErrorCode, message: String },

    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("no session yet: analyze the document before chatting")]
    NoSession,

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Segmenter(#[from] rethink_segmenter::SegmenterError),
}

impl PipelineError {
    pub fn source_failed(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Backend error code, when the backend produced one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
