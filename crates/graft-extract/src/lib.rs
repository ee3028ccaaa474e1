//! Graft Extract
//!
//! Turns the free-form text of an LLM reply into an ordered list of edit
//! blocks.
//!
//! # Core Concepts
//!
//! - [`BlockExtractor`]: Finds fenced code blocks and classifies them
//! - [`EditBlock`]: `Update`, `Removal`, or `Malformed` (reported, never dropped)
//! - [`dirty_json::parse_object`]: Lenient JSON object recovery for removals
//!
//! # Input conventions
//!
//! - ```` ```json ```` fences hold removal instructions:
//!   `{"module_path": "m.py", "targets": [{"type": "class", "name": "X"}]}`
//! - every other tagged fence is an update whose first line names the module
//!   (`# pkg/m.py`)
//! - `#¤#` lines carry import hints, `# BEGIN/END UPDATED METHOD` bracket
//!   method replacements and `## ...` marks elided code
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_extract::{BlockExtractor, EditBlock};
//!
//! for block in BlockExtractor::new().extract(&llm_output) {
//!     if let EditBlock::Update(update) = &block.block {
//!         println!("{} -> {}", block.index, update.module_path);
//!     }
//! }
//! ```

#![warn(unreachable_pub)]

mod block;
pub mod dirty_json;
mod error;
mod extractor;
mod recognize;

pub use block::{
    EditBlock, ExtractedBlock, RemovalBlock, RemovalTarget, TargetKind, UpdateBlock,
};
pub use error::ExtractionError;
pub use extractor::BlockExtractor;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
