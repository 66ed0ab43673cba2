use anyhow::{Context as AnyhowContext, Result};
use rethink_tutor::{ProviderConfig, ProviderKind, StoreConfig, TutorConfig};
use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

pub(crate) const PROVIDER_ENV: &str = "RETHINK_LLM_PROVIDER";
pub(crate) const MODEL_ENV: &str = "RETHINK_LLM_MODEL";
pub(crate) const BASE_URL_ENV: &str = "RETHINK_LLM_BASE_URL";
pub(crate) const API_KEY_ENVS: [&str; 2] = ["RETHINK_LLM_API_KEY", "OPENAI_API_KEY"];
pub(crate) const TIMEOUT_ENV: &str = "RETHINK_LLM_TIMEOUT_MS";
pub(crate) const SESSION_TTL_ENV: &str = "RETHINK_SESSION_TTL_SECS";
pub(crate) const SESSION_CAPACITY_ENV: &str = "RETHINK_SESSION_CAPACITY";
pub(crate) const SERVER_URL_ENV: &str = "RETHINK_SERVER_URL";

const DEFAULT_BIND_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const MAX_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Command-line values for `serve`, before env fallback.
#[derive(Debug, Default, Clone)]
pub(crate) struct ServeOverrides {
    pub bind: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub llm_timeout_ms: Option<u64>,
    pub session_ttl_secs: Option<u64>,
    pub session_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ServeConfig {
    pub bind: String,
    pub provider: ProviderConfig,
    pub tutor: TutorConfig,
}

impl ServeConfig {
    /// Flags first, then `RETHINK_*` variables, then defaults.
    pub(crate) fn resolve(overrides: ServeOverrides) -> Result<Self> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => {
                let port = env_parse::<u16>("PORT")?.unwrap_or(DEFAULT_PORT);
                format!("{DEFAULT_BIND_HOST}:{port}")
            }
        };

        let kind: ProviderKind = overrides
            .provider
            .or_else(|| env_string(PROVIDER_ENV))
            .map(|raw| raw.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::OpenAi);

        let timeout = overrides
            .llm_timeout_ms
            .or(env_parse(TIMEOUT_ENV)?)
            .map(Duration::from_millis)
            .unwrap_or(rethink_tutor::provider::DEFAULT_LLM_TIMEOUT);

        let mut provider = ProviderConfig::for_kind(kind);
        if let Some(model) = overrides.model.or_else(|| env_string(MODEL_ENV)) {
            provider.model = model;
        }
        if let Some(base_url) = overrides.base_url.or_else(|| env_string(BASE_URL_ENV)) {
            provider.base_url = base_url;
        }
        provider.api_key = API_KEY_ENVS.iter().find_map(|var| env_string(var));
        provider.timeout = timeout;

        let defaults = StoreConfig::default();
        let ttl = overrides
            .session_ttl_secs
            .or(env_parse(SESSION_TTL_ENV)?)
            .map_or(defaults.ttl, Duration::from_secs);
        let capacity = match overrides
            .session_capacity
            .or(env_parse(SESSION_CAPACITY_ENV)?)
        {
            Some(raw) => NonZeroUsize::new(raw)
                .with_context(|| "session capacity must be greater than 0")?,
            None => defaults.capacity,
        };

        let tutor = TutorConfig {
            store: StoreConfig { ttl, capacity },
            llm_timeout: timeout,
            ..TutorConfig::default()
        };
        tutor.validate().map_err(anyhow::Error::msg)?;

        Ok(Self {
            bind,
            provider,
            tutor,
        })
    }

    /// How often idle sessions are swept.
    pub(crate) fn purge_interval(&self) -> Duration {
        self.tutor.store.ttl.min(MAX_PURGE_INTERVAL)
    }
}

/// Backend URL for the client subcommands.
pub(crate) fn server_url(flag: Option<String>) -> String {
    flag.or_else(|| env_string(SERVER_URL_ENV))
        .unwrap_or_else(|| rethink_pipeline::DEFAULT_BACKEND_URL.to_string())
}

fn env_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(var: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(var)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{var} has an invalid value: {raw}"))
        })
        .transpose()
}
