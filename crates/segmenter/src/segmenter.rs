use crate::config::SegmenterConfig;
use crate::error::{Result, SegmenterError};
use crate::types::{Chunk, ContentUnit, UnitOrigin};
use std::collections::HashSet;

const TERMINATORS: [char; 3] = ['.', '?', '!'];

fn is_terminator(ch: char) -> bool {
    TERMINATORS.contains(&ch)
}

/// Main segmenter interface: turns a snapshot into one content unit
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    /// Create a new segmenter with configuration
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        config.validate().map_err(SegmenterError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Trim the document and keep only its trailing window.
    #[must_use]
    pub fn window<'a>(&self, text: &'a str) -> &'a str {
        tail_chars(text.trim(), self.config.window_chars)
    }

    /// Split text into candidate chunks.
    ///
    /// A boundary is a `.`, `?` or `!` followed by whitespace, or any newline. The whitespace run
    /// after a boundary is skipped. Chunks shorter than `min_chunk_chars` are dropped.
    #[must_use]
    pub fn chunks<'a>(&self, text: &'a str) -> Vec<Chunk<'a>> {
        let text = text.trim();
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut iter = text.char_indices().peekable();

        while let Some((idx, ch)) = iter.next() {
            let boundary = ch == '\n'
                || (is_terminator(ch) && iter.peek().is_some_and(|(_, next)| next.is_whitespace()));
            if !boundary {
                continue;
            }

            let end = idx + ch.len_utf8();
            self.push_chunk(&mut chunks, &text[start..end]);

            start = end;
            while let Some(&(next_idx, next)) = iter.peek() {
                if !next.is_whitespace() {
                    break;
                }
                start = next_idx + next.len_utf8();
                iter.next();
            }
        }

        if start < text.len() {
            self.push_chunk(&mut chunks, &text[start..]);
        }

        chunks
    }

    fn push_chunk<'a>(&self, chunks: &mut Vec<Chunk<'a>>, raw: &'a str) {
        let trimmed = raw.trim();
        if trimmed.chars().count() < self.config.min_chunk_chars {
            return;
        }
        chunks.push(Chunk {
            text: trimmed,
            completed: raw.ends_with('\n') || trimmed.ends_with(is_terminator),
        });
    }

    /// Select the unit to analyze.
    ///
    /// With a previous snapshot this is diff mode: the newest completed chunk that the previous
    /// snapshot did not contain. Without one, or when nothing changed, it is last-completed mode.
    #[must_use]
    pub fn segment(&self, current: &str, previous: Option<&str>) -> ContentUnit {
        let text = current.trim();
        if text.is_empty() {
            return ContentUnit::empty();
        }

        let chunks = self.chunks(text);

        if let Some(previous) = previous {
            if let Some(changed) = Self::newest_changed(&chunks, &self.chunks(previous)) {
                log::debug!("segmenter: changed chunk ({} chars)", changed.text.len());
                return ContentUnit::from_chunk(changed, UnitOrigin::Changed);
            }
        }

        self.select_last_completed(text, &chunks)
    }

    /// Last-completed mode on its own.
    #[must_use]
    pub fn last_completed(&self, text: &str) -> ContentUnit {
        let text = text.trim();
        if text.is_empty() {
            return ContentUnit::empty();
        }
        let chunks = self.chunks(text);
        self.select_last_completed(text, &chunks)
    }

    fn newest_changed<'a>(current: &[Chunk<'a>], previous: &[Chunk<'_>]) -> Option<Chunk<'a>> {
        let seen: HashSet<&str> = previous.iter().map(|chunk| chunk.text).collect();
        current
            .iter()
            .rev()
            .find(|chunk| chunk.completed && !seen.contains(chunk.text))
            .copied()
    }

    fn select_last_completed(&self, text: &str, chunks: &[Chunk<'_>]) -> ContentUnit {
        if let Some(chunk) = chunks.iter().rev().find(|chunk| chunk.completed) {
            return ContentUnit::from_chunk(*chunk, UnitOrigin::LastCompleted);
        }

        if let Some(chunk) = chunks.last() {
            return ContentUnit::from_chunk(*chunk, UnitOrigin::LastChunk);
        }

        let tail = tail_chars(text, self.config.tail_chars);
        if tail.is_empty() {
            return ContentUnit::empty();
        }
        ContentUnit {
            text: tail.to_string(),
            completed: tail.ends_with(is_terminator),
            origin: UnitOrigin::RawTail,
        }
    }
}

/// Last `max` characters of `text`, cut on a char boundary.
fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let start = text
        .char_indices()
        .nth(count - max)
        .map_or(text.len(), |(idx, _)| idx);
    &text[start..]
}
