use serde::{Deserialize, Serialize};

/// Configuration for content unit extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Maximum characters of the document considered (the trailing window)
    pub window_chars: usize,

    /// Chunks with fewer characters than this are discarded
    pub min_chunk_chars: usize,

    /// Characters of raw tail returned when no chunk survives filtering
    pub tail_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            window_chars: 1200,
            min_chunk_chars: 5,
            tail_chars: 300,
        }
    }
}

impl SegmenterConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window_chars == 0 {
            return Err("window_chars must be > 0".to_string());
        }

        if self.tail_chars == 0 {
            return Err("tail_chars must be > 0".to_string());
        }

        if self.tail_chars > self.window_chars {
            return Err(format!(
                "tail_chars ({}) cannot exceed window_chars ({})",
                self.tail_chars, self.window_chars
            ));
        }

        Ok(())
    }
}
