use super::{
    check_status, http_client, join_url, CompletionProvider, CompletionRequest, ProviderConfig,
    ResponseMode,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible `chat/completions` backend with native JSON-object mode.
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ProviderError::Auth(
                    "missing API key: set OPENAI_API_KEY or RETHINK_LLM_API_KEY".to_string(),
                )
            })?;

        Ok(Self {
            client: http_client(config.timeout)?,
            url: join_url(&config.base_url, "chat/completions"),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Native
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if request.structured {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;
        let resp = check_status(resp).await?;

        let completion: ChatCompletion = resp
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Decode("completion has no message content".to_string()))
    }
}
