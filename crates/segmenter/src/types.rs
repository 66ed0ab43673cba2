use serde::{Deserialize, Serialize};

/// One candidate sentence or line inside a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Trimmed chunk text
    pub text: &'a str,

    /// Whether the chunk was closed by a sentence terminator or a newline
    pub completed: bool,
}

/// How a content unit was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOrigin {
    /// Completed chunk not present in the previous snapshot
    Changed,
    /// Newest completed chunk
    LastCompleted,
    /// Newest chunk, still being written
    LastChunk,
    /// Trailing characters of the window (no chunk survived filtering)
    RawTail,
    /// Nothing to analyze
    Empty,
}

/// The single unit of content selected for analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub text: String,
    pub completed: bool,
    pub origin: UnitOrigin,
}

impl ContentUnit {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            text: String::new(),
            completed: false,
            origin: UnitOrigin::Empty,
        }
    }

    pub(crate) fn from_chunk(chunk: Chunk<'_>, origin: UnitOrigin) -> Self {
        Self {
            text: chunk.text.to_string(),
            completed: chunk.completed,
            origin,
        }
    }

    /// Callers must not dispatch an empty unit
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
