use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const HEALTH_STATUS_OK: &str = "ok";

/// Subject area a document belongs to. Selects the evaluation context of the analysis prompt.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Writing,
    Math,
    Science,
    Other,
}

impl Subject {
    pub const ALL: [Self; 4] = [Self::Writing, Self::Math, Self::Science, Self::Other];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Writing => "writing",
            Self::Math => "math",
            Self::Science => "science",
            Self::Other => "other",
        }
    }

    /// Comma separated list of accepted names, for validation messages.
    #[must_use]
    pub fn accepted() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown subject '{}' (expected one of: {})", .0, Subject::accepted())]
pub struct UnknownSubject(pub String);

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw {
            "writing" => Ok(Self::Writing),
            "math" => Ok(Self::Math),
            "science" => Ok(Self::Science),
            "other" => Ok(Self::Other),
            other => Err(UnknownSubject(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /analyze`.
///
/// Every field is optional on the wire so that a missing field is reported as `MISSING_FIELD`
/// instead of a generic deserialization failure. `subject` stays a raw string for the same reason
/// (`INVALID_SUBJECT`).
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub new_content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub session_id: String,
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Authoritative chat gate after this call.
    pub has_active_error: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub has_active_error: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 / ISO-8601 timestamp.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingField,
    InvalidSubject,
    InvalidSession,
    NoActiveError,
    LlmError,
    InvalidRequest,
    OriginRejected,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidSubject => "INVALID_SUBJECT",
            Self::InvalidSession => "INVALID_SESSION",
            Self::NoActiveError => "NO_ACTIVE_ERROR",
            Self::LlmError => "LLM_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::OriginRejected => "ORIGIN_REJECTED",
        }
    }

    /// HTTP status the code is reported with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::MissingField
            | Self::InvalidSubject
            | Self::InvalidSession
            | Self::NoActiveError
            | Self::InvalidRequest => 400,
            Self::OriginRejected => 403,
            Self::LlmError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: ErrorCode,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

/// Named JSON schemas of every wire type, in a stable order.
#[must_use]
pub fn wire_schemas() -> Vec<(&'static str, schemars::Schema)> {
    vec![
        ("AnalyzeRequest", schemars::schema_for!(AnalyzeRequest)),
        ("AnalyzeResponse", schemars::schema_for!(AnalyzeResponse)),
        ("ChatRequest", schemars::schema_for!(ChatRequest)),
        ("ChatResponse", schemars::schema_for!(ChatResponse)),
        ("HealthResponse", schemars::schema_for!(HealthResponse)),
        ("ErrorEnvelope", schemars::schema_for!(ErrorEnvelope)),
    ]
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
