use super::{
    check_status, http_client, join_url, CompletionProvider, CompletionRequest, ProviderConfig,
    ResponseMode,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Ollama-style `/api/chat` backend. Returns free text; structured answers are extracted by the
/// caller.
pub struct InferenceProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct InferenceChatResponse {
    message: InferenceMessage,
}

#[derive(Deserialize)]
struct InferenceMessage {
    content: String,
}

impl InferenceProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            url: join_url(&config.base_url, "api/chat"),
            model: config.model.clone(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl CompletionProvider for InferenceProvider {
    fn name(&self) -> &'static str {
        "inference"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::FreeText
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": request.messages,
            "options": { "temperature": request.temperature },
        });

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await.map_err(|e| {
            log::debug!("inference backend unreachable at {}: {e}", self.url);
            ProviderError::from_reqwest(e, self.timeout)
        })?;
        let resp = check_status(resp).await?;

        let out: InferenceChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;
        Ok(out.message.content)
    }
}
