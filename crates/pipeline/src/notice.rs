/// What the user should see after a pipeline step. Rendering is up to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The document is too short to check yet.
    KeepWriting,
    Analyzing,
    IssueFound { location: String },
    /// The user is editing while an error is still active.
    IssueStillPresent,
    LookingGood,
    Failed { message: String },
    Hidden,
}

/// Last analysis result, kept for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResult {
    pub has_error: bool,
    pub location: Option<String>,
}
