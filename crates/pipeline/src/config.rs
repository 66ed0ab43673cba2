use std::time::Duration;

/// Timing and size limits of the client pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Quiet period after the last edit before analysis fires
    pub pause: Duration,

    /// Minimum spacing between two analysis calls
    pub cooldown: Duration,

    /// Documents shorter than this (trimmed) are not analyzed
    pub min_chars: usize,

    /// Only the trailing window of the document is sent
    pub window_chars: usize,

    /// How long an exported snapshot is reused
    pub export_ttl: Duration,

    /// Location shown when the backend reports an error without one
    pub fallback_location: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(1800),
            cooldown: Duration::from_millis(8000),
            min_chars: 8,
            window_chars: 1200,
            export_ttl: Duration::from_millis(5000),
            fallback_location: "In your recent work.".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.pause.is_zero() {
            return Err("pause must be greater than 0".to_string());
        }
        if self.min_chars == 0 {
            return Err("min_chars must be greater than 0".to_string());
        }
        if self.window_chars < self.min_chars {
            return Err(format!(
                "window_chars ({}) must be >= min_chars ({})",
                self.window_chars, self.min_chars
            ));
        }
        if self.fallback_location.trim().is_empty() {
            return Err("fallback_location must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = PipelineConfig::default();
        assert_eq!(config.pause, Duration::from_millis(1800));
        assert_eq!(config.cooldown, Duration::from_millis(8000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn window_smaller_than_minimum_is_invalid() {
        let config = PipelineConfig {
            window_chars: 4,
            ..PipelineConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("window_chars"));
    }
}
