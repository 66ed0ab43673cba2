//! # Rethink Pipeline
//!
//! Client side of Rethink: decides when a document is analyzed and what part of it is sent.
//!
//! ```text
//! edits ──► TriggerScheduler (debounce) ──► DocumentSource ──► Segmenter
//!                                                                  │
//!            notices ◄── Analyzer ◄── TutorApi ◄── DispatchGuard ◄─┘
//! ```
//!
//! The guard checks length, cooldown and duplicates at fire time, against the state at that
//! moment. The backend's `hasActiveError` is the only source of the local active-error mirror.

pub mod analyzer;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod notice;
pub mod source;
pub mod subject;
pub mod trigger;

pub use analyzer::{AnalyzeCall, Analyzer, EditEvent, Prepared};
pub use client::{HttpTutorClient, TutorApi, DEFAULT_BACKEND_URL};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use guard::{DispatchGuard, Verdict};
pub use notice::{LastResult, Notice};
pub use source::{
    CachedSource, DocumentSource, FallbackSource, Key, KeystrokeBuffer, Provenance, Snapshot,
    TextSource, UnavailableSource,
};
pub use subject::detect_subject;
pub use trigger::TriggerScheduler;
