use crate::error::{Result, TutorError};
use rethink_protocol::{ChatTurn, Subject};
use serde::Deserialize;

/// Gate of the tutoring dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No unresolved error; chat is refused.
    Clean,
    /// An error was detected and chat is allowed.
    ErrorActive,
}

/// Last error found in the student's work.
///
/// `internal` is only ever shown to the tutoring model. `location` is the vague hint that is
/// returned to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedError {
    pub internal: String,
    pub location: String,
}

/// Result of one analysis call, as understood by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Clean,
    Error(DetectedError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAnalysis {
    has_error: bool,
    #[serde(default)]
    internal_error: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl TryFrom<RawAnalysis> for AnalysisOutcome {
    type Error = TutorError;

    fn try_from(raw: RawAnalysis) -> Result<Self> {
        if !raw.has_error {
            return Ok(Self::Clean);
        }

        let internal = raw
            .internal_error
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TutorError::MalformedResponse("hasError without internalError".into()))?;
        let location = raw
            .location
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TutorError::MalformedResponse("hasError without location".into()))?;

        Ok(Self::Error(DetectedError { internal, location }))
    }
}

/// Server-side state of one document/user interaction.
///
/// The error fields live in a single `Option` so that they are always set and cleared together,
/// and the gate is derived from it rather than stored separately.
#[derive(Debug, Clone)]
pub struct Session {
    subject: Subject,
    full_text: String,
    error: Option<DetectedError>,
    chat_history: Vec<ChatTurn>,
}

impl Session {
    #[must_use]
    pub const fn new(subject: Subject) -> Self {
        Self {
            subject,
            full_text: String::new(),
            error: None,
            chat_history: Vec::new(),
        }
    }

    #[must_use]
    pub const fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Replace the document snapshot. Never appends.
    pub fn set_full_text(&mut self, text: impl Into<String>) {
        self.full_text = text.into();
    }

    #[must_use]
    pub const fn state(&self) -> GateState {
        if self.error.is_some() {
            GateState::ErrorActive
        } else {
            GateState::Clean
        }
    }

    #[must_use]
    pub const fn has_active_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub fn error_internal(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.internal.as_str())
    }

    #[must_use]
    pub fn error_location(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.location.as_str())
    }

    #[must_use]
    pub fn chat_history(&self) -> &[ChatTurn] {
        &self.chat_history
    }

    /// Drive the gate with an analysis result.
    ///
    /// Every detection (even while already active) starts a new episode with an empty dialogue.
    /// A clean result clears the error and the dialogue.
    pub fn apply_analysis(&mut self, outcome: AnalysisOutcome) -> GateState {
        match outcome {
            AnalysisOutcome::Error(detected) => {
                self.error = Some(detected);
                self.chat_history.clear();
            }
            AnalysisOutcome::Clean => {
                self.error = None;
                self.chat_history.clear();
            }
        }
        self.state()
    }

    /// Error context for building a chat prompt. Fails in `Clean`.
    pub fn chat_context(&self) -> Result<&DetectedError> {
        self.error.as_ref().ok_or(TutorError::NoActiveError)
    }

    /// Append one user/assistant exchange to the current episode.
    pub fn record_exchange(
        &mut self,
        message: impl Into<String>,
        reply: impl Into<String>,
    ) -> Result<()> {
        if self.error.is_none() {
            return Err(TutorError::NoActiveError);
        }
        self.chat_history.push(ChatTurn::user(message));
        self.chat_history.push(ChatTurn::assistant(reply));
        Ok(())
    }
}
