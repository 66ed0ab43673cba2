use crate::config::TutorConfig;
use crate::error::{ProviderError, Result, TutorError};
use crate::extract::{extract_json, parse_strict};
use crate::prompt;
use crate::provider::{CompletionProvider, CompletionRequest, ResponseMode};
use crate::session::{AnalysisOutcome, RawAnalysis};
use crate::store::SessionStore;
use rethink_protocol::{AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, Subject};
use std::sync::Arc;

/// Server core: validates requests, drives the error gate and talks to the provider.
///
/// Validation and session checks happen before any provider call. The session lock is held for
/// the whole request, provider call included, so two requests for one session never interleave.
pub struct TutorService {
    store: SessionStore,
    provider: Arc<dyn CompletionProvider>,
    config: TutorConfig,
}

impl TutorService {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: TutorConfig) -> Self {
        Self {
            store: SessionStore::new(config.store),
            provider,
            config,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &TutorConfig {
        &self.config
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// `POST /analyze`
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
        let subject_raw = required(request.subject.as_deref(), "subject")?;
        let full_text = required(request.full_text.as_deref(), "fullText")?;
        let new_content = required(request.new_content.as_deref(), "newContent")?;
        let subject: Subject = subject_raw
            .parse()
            .map_err(|_| TutorError::InvalidSubject(subject_raw.to_string()))?;

        let (session_id, shared) = self
            .store
            .resolve_or_create(request.session_id.as_deref(), subject);
        let mut session = shared.lock().await;
        session.set_full_text(full_text);

        // The stored subject records how the session started; each unit is judged by its own.
        let messages = prompt::analysis_messages(subject, full_text, new_content);
        let reply = self
            .complete(CompletionRequest {
                messages,
                temperature: self.config.analysis_temperature,
                structured: true,
            })
            .await
            .inspect_err(|err| log::error!("analyze session={session_id}: {err}"))?;

        let outcome = self.parse_analysis(&reply).inspect_err(|err| {
            log::warn!("analyze session={session_id}: {err}");
        })?;

        let location = match &outcome {
            AnalysisOutcome::Error(detected) => Some(detected.location.clone()),
            AnalysisOutcome::Clean => None,
        };
        let state = session.apply_analysis(outcome);
        log::info!(
            "analyze session={session_id} subject={subject} has_error={} state={state:?}",
            location.is_some()
        );

        Ok(AnalyzeResponse {
            session_id,
            has_error: location.is_some(),
            location,
            has_active_error: session.has_active_error(),
        })
    }

    /// `POST /chat`
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let session_id = required(request.session_id.as_deref(), "sessionId")?;
        let message = required(request.message.as_deref(), "message")?;

        let shared = self.store.get(session_id).ok_or(TutorError::InvalidSession)?;
        let mut session = shared.lock().await;
        let context = session.chat_context()?;

        let messages = prompt::chat_messages(
            session.full_text(),
            &context.internal,
            session.chat_history(),
            message,
        );
        let reply = self
            .complete(CompletionRequest {
                messages,
                temperature: self.config.chat_temperature,
                structured: false,
            })
            .await
            .inspect_err(|err| log::error!("chat session={session_id}: {err}"))?;

        session.record_exchange(message, reply.clone())?;
        log::info!(
            "chat session={session_id} history={}",
            session.chat_history().len()
        );

        Ok(ChatResponse {
            reply,
            has_active_error: session.has_active_error(),
        })
    }

    /// Drop idle sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let timeout = self.config.llm_timeout;
        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(reply) => reply.map_err(TutorError::from),
            Err(_) => Err(ProviderError::Timeout(timeout).into()),
        }
    }

    fn parse_analysis(&self, reply: &str) -> Result<AnalysisOutcome> {
        let raw: Option<RawAnalysis> = match self.provider.response_mode() {
            ResponseMode::Native => parse_strict(reply),
            ResponseMode::FreeText => extract_json(reply).map(|extracted| {
                log::debug!("analysis JSON extracted via {:?}", extracted.from);
                extracted.value
            }),
        };
        let raw = raw.ok_or_else(|| {
            TutorError::MalformedResponse(format!(
                "{} reply is not an analysis object ({} chars)",
                self.provider.name(),
                reply.len()
            ))
        })?;
        AnalysisOutcome::try_from(raw)
    }
}

/// Absent and empty values are both reported as missing.
fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(TutorError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StubProvider;
    use rethink_protocol::ErrorCode;

    fn service(stub: StubProvider) -> (TutorService, Arc<StubProvider>) {
        let stub = Arc::new(stub);
        (
            TutorService::new(stub.clone(), TutorConfig::default()),
            stub,
        )
    }

    fn analyze_request(subject: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            session_id: None,
            subject: Some(subject.to_string()),
            full_text: Some("2+2=5".to_string()),
            new_content: Some("2+2=5".to_string()),
        }
    }

    #[tokio::test]
    async fn validation_happens_before_provider_call() {
        let (service, stub) = service(StubProvider::new(ResponseMode::Native));

        let mut missing = analyze_request("math");
        missing.new_content = Some(String::new());
        let err = service.analyze(missing).await.unwrap_err();
        assert!(matches!(err, TutorError::MissingField("newContent")));

        let err = service.analyze(analyze_request("history")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSubject);

        let err = service
            .chat(ChatRequest {
                session_id: Some("nope".to_string()),
                message: Some("hi".to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSession);

        assert_eq!(stub.call_count(), 0);
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn analysis_uses_low_temperature_and_structured_output() {
        let (service, stub) = service(StubProvider::new(ResponseMode::Native));
        let resp = service.analyze(analyze_request("math")).await.unwrap();
        assert!(!resp.has_error);
        assert!(!resp.has_active_error);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].structured);
        assert!((requests[0].temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn free_text_provider_reply_is_extracted() {
        let (service, _) = service(StubProvider::new(ResponseMode::FreeText).with_reply(
            "Sure:\n```json\n{\"hasError\": true, \"internalError\": \"x\", \"location\": \"In your last line.\"}\n```",
        ));
        let resp = service.analyze(analyze_request("math")).await.unwrap();
        assert!(resp.has_error);
        assert_eq!(resp.location.as_deref(), Some("In your last line."));
    }

    #[tokio::test]
    async fn native_provider_prose_is_malformed() {
        let (service, _) = service(
            StubProvider::new(ResponseMode::Native).with_reply("I think {\"hasError\": false}"),
        );
        let err = service.analyze(analyze_request("math")).await.unwrap_err();
        assert!(matches!(err, TutorError::MalformedResponse(_)));
        assert_eq!(err.code(), ErrorCode::LlmError);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let stub = StubProvider::new(ResponseMode::Native)
            .with_delay(std::time::Duration::from_secs(120));
        let (service, _) = service(stub);
        let err = service.analyze(analyze_request("math")).await.unwrap_err();
        assert!(matches!(
            err,
            TutorError::Provider(ProviderError::Timeout(_))
        ));
    }
}
