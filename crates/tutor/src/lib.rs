//! # Rethink Tutor
//!
//! Server core of the Rethink tutor: detects mistakes in student work and gates a Socratic
//! dialogue about the most recent one.
//!
//! ## Architecture
//!
//! ```text
//! AnalyzeRequest / ChatRequest
//!          │
//!          ▼
//!   TutorService ──► SessionStore (LRU + idle TTL, one async mutex per session)
//!          │
//!          ├──► prompt   (pure templates)
//!          ├──► CompletionProvider (openai | inference | stub)
//!          ├──► extract  (strict → fenced → braced JSON)
//!          ▼
//!   Session::apply_analysis  (CLEAN ⇄ ERROR_ACTIVE)
//! ```
//!
//! Chat is accepted only while an error is active. Only analysis results move the gate.
//!
//! ## Example
//!
//! ```no_run
//! use rethink_tutor::{ResponseMode, StubProvider, TutorConfig, TutorService};
//! use rethink_protocol::AnalyzeRequest;
//! use std::sync::Arc;
//!
//! # async fn example() -> rethink_tutor::Result<()> {
//! let service = TutorService::new(
//!     Arc::new(StubProvider::new(ResponseMode::Native)),
//!     TutorConfig::default(),
//! );
//! let resp = service
//!     .analyze(AnalyzeRequest {
//!         session_id: None,
//!         subject: Some("math".into()),
//!         full_text: Some("2+2=4".into()),
//!         new_content: Some("2+2=4".into()),
//!     })
//!     .await?;
//! println!("{} {}", resp.session_id, resp.has_error);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod provider;
pub mod service;
pub mod session;
pub mod store;

pub use config::TutorConfig;
pub use error::{ErrorCategory, ProviderError, Result, TutorError, LLM_UNAVAILABLE};
pub use provider::{
    build_provider, CompletionProvider, CompletionRequest, InferenceProvider, OpenAiProvider,
    ProviderConfig, ProviderKind, ResponseMode, StubProvider,
};
pub use service::TutorService;
pub use session::{AnalysisOutcome, DetectedError, GateState, Session};
pub use store::{SessionStore, SharedSession, StoreConfig};
