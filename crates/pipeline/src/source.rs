//! Where document text comes from.
//!
//! A [`DocumentSource`] yields the current text plus a provenance tag. Sources compose: a
//! [`CachedSource`] wraps an expensive export, and a [`FallbackSource`] falls back to the
//! keystroke buffer while the export is not usable yet.

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Full document export
    Export,
    /// Locally typed characters
    Keystrokes,
    /// Cached export served after a failed fetch
    Stale,
    /// Fixed text handed in by the caller
    Static,
    None,
}

impl Provenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Keystrokes => "keystrokes",
            Self::Stale => "stale",
            Self::Static => "static",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub provenance: Provenance,
}

impl Snapshot {
    pub fn new(text: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            provenance,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new(), Provenance::None)
    }

    /// Character count of the trimmed text.
    #[must_use]
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot>;
}

#[async_trait]
impl<S: DocumentSource + ?Sized> DocumentSource for Arc<S> {
    async fn snapshot(&self) -> Result<Snapshot> {
        (**self).snapshot().await
    }
}

/// Fixed text, e.g. a file handed to the command line.
#[derive(Debug, Clone)]
pub struct TextSource {
    text: String,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl DocumentSource for TextSource {
    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.text.clone(), Provenance::Static))
    }
}

/// A key press as seen by the keystroke buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    /// Any key pressed with Ctrl, Alt or Meta held.
    Shortcut,
    /// Navigation and other non-text keys.
    Other,
}

/// Characters typed since the page was opened.
///
/// Covers the gap before the first export is available.
#[derive(Debug, Default)]
pub struct KeystrokeBuffer {
    text: Mutex<String>,
}

impl KeystrokeBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, key: Key) {
        let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        match key {
            Key::Char(ch) => text.push(ch),
            Key::Backspace => {
                text.pop();
            }
            Key::Enter => text.push('\n'),
            Key::Shortcut | Key::Other => {}
        }
    }

    pub fn type_str(&self, s: &str) {
        for ch in s.chars() {
            self.apply(if ch == '\n' { Key::Enter } else { Key::Char(ch) });
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

#[async_trait]
impl DocumentSource for KeystrokeBuffer {
    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.text(), Provenance::Keystrokes))
    }
}

struct CacheEntry {
    text: String,
    fetched_at: Instant,
}

/// Reuses the last successful snapshot of `inner` for `ttl`.
///
/// A failed fetch serves the last cached text as [`Provenance::Stale`] instead of failing. Only
/// a failure with nothing cached is an error.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    cache: tokio::sync::Mutex<Option<CacheEntry>>,
}

impl<S: DocumentSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: DocumentSource> DocumentSource for CachedSource<S> {
    async fn snapshot(&self) -> Result<Snapshot> {
        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl && !entry.text.is_empty() {
                return Ok(Snapshot::new(entry.text.clone(), Provenance::Export));
            }
        }

        match self.inner.snapshot().await {
            Ok(snapshot) => {
                let text = snapshot.text.trim().to_string();
                log::debug!("export ok ({} chars)", text.chars().count());
                *cache = Some(CacheEntry {
                    text: text.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(Snapshot::new(text, snapshot.provenance))
            }
            Err(err) => match cache.as_ref() {
                Some(entry) => {
                    log::debug!("export failed, serving cached text: {err}");
                    Ok(Snapshot::new(entry.text.clone(), Provenance::Stale))
                }
                None => Err(err),
            },
        }
    }
}

/// Primary source when it has enough text, keystrokes otherwise.
pub struct FallbackSource<P> {
    primary: P,
    keystrokes: Arc<KeystrokeBuffer>,
    min_chars: usize,
}

impl<P: DocumentSource> FallbackSource<P> {
    pub fn new(primary: P, keystrokes: Arc<KeystrokeBuffer>, min_chars: usize) -> Self {
        Self {
            primary,
            keystrokes,
            min_chars,
        }
    }
}

#[async_trait]
impl<P: DocumentSource> DocumentSource for FallbackSource<P> {
    async fn snapshot(&self) -> Result<Snapshot> {
        match self.primary.snapshot().await {
            Ok(snapshot) if snapshot.text.chars().count() >= self.min_chars => return Ok(snapshot),
            Ok(_) => {}
            Err(err) => log::debug!("primary source unavailable: {err}"),
        }

        if !self.keystrokes.is_empty() {
            return self.keystrokes.snapshot().await;
        }
        Ok(Snapshot::empty())
    }
}

/// Source that always fails. Useful to exercise fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSource;

#[async_trait]
impl DocumentSource for UnavailableSource {
    async fn snapshot(&self) -> Result<Snapshot> {
        Err(PipelineError::source_failed("no document available"))
    }
}
