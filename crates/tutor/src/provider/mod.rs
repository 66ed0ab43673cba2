//! Completion providers.
//!
//! One trait, several backends. The backend is chosen once from [`ProviderConfig`] at startup.

mod inference;
mod openai;
mod stub;

pub use inference::InferenceProvider;
pub use openai::OpenAiProvider;
pub use stub::StubProvider;

use crate::error::ProviderError;
use async_trait::async_trait;
use rethink_protocol::ChatTurn;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// How a provider returns structured answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// The backend enforces a JSON object; the text is parsed directly.
    Native,
    /// The backend returns free text that may wrap JSON in prose or code fences.
    FreeText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    /// Ask for a JSON object when the backend supports it.
    pub structured: bool,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn response_mode(&self) -> ResponseMode;

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Inference,
    Stub,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Inference => "inference",
            Self::Stub => "stub",
        }
    }

    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Inference => "llama3.1",
            Self::Stub => "stub",
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Inference => "http://127.0.0.1:11434",
            Self::Stub => "",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "inference" | "ollama" => Ok(Self::Inference),
            "stub" => Ok(Self::Stub),
            other => Err(ProviderError::Config(format!(
                "unsupported provider '{other}' (expected 'openai', 'inference' or 'stub')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Defaults for `kind`, without credentials.
    #[must_use]
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            api_key: None,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

/// Build the configured provider.
pub fn build_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    let provider: Arc<dyn CompletionProvider> = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Inference => Arc::new(InferenceProvider::new(config)?),
        ProviderKind::Stub => Arc::new(StubProvider::new(ResponseMode::Native)),
    };
    Ok(provider)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("failed to build http client: {e}")))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Turn a non-success response into a [`ProviderError`].
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Inference);
        assert_eq!(" stub ".parse::<ProviderKind>().unwrap(), ProviderKind::Stub);
        assert!(matches!(
            "bedrock".parse::<ProviderKind>(),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.openai.com/v1/", "/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(join_url("http://h:1", "api/chat"), "http://h:1/api/chat");
    }

    #[test]
    fn openai_requires_api_key() {
        let config = ProviderConfig::for_kind(ProviderKind::OpenAi);
        assert!(matches!(build_provider(&config), Err(ProviderError::Auth(_))));
    }

    #[test]
    fn builds_each_kind() {
        let mut config = ProviderConfig::for_kind(ProviderKind::OpenAi);
        config.api_key = Some("sk-test".to_string());
        assert_eq!(build_provider(&config).unwrap().name(), "openai");

        let config = ProviderConfig::for_kind(ProviderKind::Inference);
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "inference");
        assert_eq!(provider.response_mode(), ResponseMode::FreeText);

        let config = ProviderConfig::for_kind(ProviderKind::Stub);
        assert_eq!(build_provider(&config).unwrap().name(), "stub");
    }
}
