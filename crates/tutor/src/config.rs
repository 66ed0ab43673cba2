use crate::provider::DEFAULT_LLM_TIMEOUT;
use crate::store::StoreConfig;
use std::time::Duration;

pub const ANALYSIS_TEMPERATURE: f32 = 0.2;
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Configuration for [`crate::TutorService`]
#[derive(Debug, Clone, PartialEq)]
pub struct TutorConfig {
    /// Session store eviction policy
    pub store: StoreConfig,

    /// Upper bound on one provider call; expiry is reported as a provider timeout
    pub llm_timeout: Duration,

    /// Sampling temperature for error detection
    pub analysis_temperature: f32,

    /// Sampling temperature for tutoring replies
    pub chat_temperature: f32,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            analysis_temperature: ANALYSIS_TEMPERATURE,
            chat_temperature: CHAT_TEMPERATURE,
        }
    }
}

impl TutorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_timeout.is_zero() {
            return Err("llm_timeout must be greater than 0".to_string());
        }
        if self.store.ttl.is_zero() {
            return Err("session ttl must be greater than 0".to_string());
        }
        for (name, value) in [
            ("analysis_temperature", self.analysis_temperature),
            ("chat_temperature", self.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(format!("{name} must be within 0.0..=2.0"));
            }
        }
        Ok(())
    }
}
