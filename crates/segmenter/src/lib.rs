//! # Rethink Segmenter
//!
//! Picks the single "unit of new content" (a sentence or a line) that the error detector should
//! look at, out of a continuously edited document.
//!
//! ## Pipeline
//!
//! ```text
//! Document snapshot
//!     │
//!     ├──> Window (trim, keep the last N characters)
//!     │
//!     ├──> Chunk splitting
//!     │    ├─> boundaries: `.?!` followed by whitespace, or a newline
//!     │    └─> drop chunks shorter than the minimum length
//!     │
//!     └──> Unit selection
//!          ├─> Diff mode: newest completed chunk absent from the previous snapshot
//!          └─> Last-completed mode: newest completed chunk, else last chunk, else raw tail
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rethink_segmenter::{Segmenter, SegmenterConfig};
//!
//! let segmenter = Segmenter::new(SegmenterConfig::default()).unwrap();
//! let unit = segmenter.segment("The sky is blue. Water is dry.", None);
//! assert_eq!(unit.text, "Water is dry.");
//! ```

mod config;
mod error;
mod segmenter;
mod types;

pub use config::SegmenterConfig;
pub use error::{Result, SegmenterError};
pub use segmenter::Segmenter;
pub use types::{Chunk, ContentUnit, UnitOrigin};
