use super::{CompletionProvider, CompletionRequest, ResponseMode};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const STUB_ANALYSIS_REPLY: &str = r#"{"hasError": false}"#;
const STUB_CHAT_REPLY: &str = "What do you notice when you read that part again slowly?";

/// Offline provider with scripted replies.
///
/// Queued replies are served first, in order. With an empty queue a structured request gets a
/// clean analysis and a chat request gets a generic tutoring question.
pub struct StubProvider {
    mode: ResponseMode,
    delay: Option<Duration>,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubProvider {
    #[must_use]
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            delay: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(text.into()));
    }

    pub fn push_failure(&self, error: ProviderError) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn response_mode(&self) -> ResponseMode {
        self.mode
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let structured = request.structured;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(reply) => reply,
            None if structured => Ok(STUB_ANALYSIS_REPLY.to_string()),
            None => Ok(STUB_CHAT_REPLY.to_string()),
        }
    }
}
