//! Graft Engine
//!
//! Applies the edit blocks found in LLM output to a Python source tree.
//! Every block goes through read → parse → transform → validate → format →
//! write and succeeds or fails on its own; the run ends with one
//! [`DiffRecord`] per block.
//!
//! # Core Concepts
//!
//! - [`Controller`]: Drives extraction and the per-block pipeline
//! - [`Integrator`]: Import merge, node merge by key, method replacement
//! - [`Remover`]: Deletes classes, functions and variables by name
//! - [`FileStore`]: Path confinement, backups, atomic writes
//! - [`EventSink`]: Where per-block events go (`tracing` by default)
//! - [`RunReport`]: Records, unified diffs and the process exit code
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_engine::{Controller, EngineConfig};
//!
//! let config = EngineConfig::new()
//!     .with_root_dir("project")
//!     .with_input_file("llm_output.md")
//!     .with_dry_run(true);
//! let report = Controller::with_tracing(config).run()?;
//! for record in &report.records {
//!     if let Some(diff) = &record.unified_diff {
//!         print!("{diff}");
//!     }
//! }
//! std::process::exit(i32::from(report.exit_code()));
//! ```

#![warn(unreachable_pub)]

mod cancel;
mod config;
mod controller;
mod error;
mod fs;
mod integrate;
mod remove;
mod report;
mod sink;
mod state;

pub use cancel::CancellationToken;
pub use config::{ConfigFormat, EngineConfig};
pub use controller::Controller;
pub use error::{EngineError, ErrorKind};
pub use fs::{backup_path, FileStore};
pub use integrate::Integrator;
pub use remove::{Removal, Remover};
pub use report::{unified_diff, DiffRecord, RunReport};
pub use sink::{BlockLog, EngineEvent, EventLevel, EventSink, MemorySink, TracingSink};
pub use state::ModuleState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CancellationToken, Controller, DiffRecord, EngineConfig, EngineError, ErrorKind,
        EventSink, RunReport,
    };
}
