use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use rethink_protocol::{
    AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, ErrorEnvelope, Subject,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend calls made by the pipeline.
///
/// Implementations own the session id: `analyze` stores the id the backend echoes and both calls
/// send it back.
#[async_trait]
pub trait TutorApi: Send + Sync {
    async fn analyze(
        &self,
        subject: Subject,
        full_text: &str,
        new_content: &str,
    ) -> Result<AnalyzeResponse>;

    async fn chat(&self, message: &str) -> Result<ChatResponse>;

    fn session_id(&self) -> Option<String>;
}

/// [`TutorApi`] over HTTP.
pub struct HttpTutorClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Mutex<Option<String>>,
}

impl HttpTutorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: Mutex::new(None),
        })
    }

    /// Resume an existing session.
    #[must_use]
    pub fn with_session(self, session_id: impl Into<String>) -> Self {
        self.set_session_id(Some(session_id.into()));
        self
    }

    fn set_session_id(&self, id: Option<String>) {
        *self
            .session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| {
                PipelineError::Transport(format!("unreadable response from {url}: {e}"))
            });
        }

        match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            Ok(envelope) => Err(PipelineError::Api {
                code: envelope.code,
                message: envelope.error,
            }),
            Err(_) => Err(PipelineError::Transport(format!("{url} returned HTTP {status}"))),
        }
    }
}

#[async_trait]
impl TutorApi for HttpTutorClient {
    async fn analyze(
        &self,
        subject: Subject,
        full_text: &str,
        new_content: &str,
    ) -> Result<AnalyzeResponse> {
        let request = AnalyzeRequest {
            session_id: self.session_id(),
            subject: Some(subject.as_str().to_string()),
            full_text: Some(full_text.to_string()),
            new_content: Some(new_content.to_string()),
        };
        let response: AnalyzeResponse = self.post("/analyze", &request).await?;
        self.set_session_id(Some(response.session_id.clone()));
        Ok(response)
    }

    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let session_id = self.session_id().ok_or(PipelineError::NoSession)?;
        let request = ChatRequest {
            session_id: Some(session_id),
            message: Some(message.to_string()),
        };
        self.post("/chat", &request).await
    }

    fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
