//! Per-block records and the run report

use crate::error::{EngineError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    /// Index of the block in the LLM output
    pub block_index: usize,
    /// Whether the block was applied (or was a no-op)
    pub ok: bool,
    /// Outcome summary or error message
    pub message: String,
    /// Unified diff of the module; `None` on failure or when nothing changed
    pub unified_diff: Option<String>,
    /// Resolved module path, when known
    pub module_path: Option<PathBuf>,
    /// Error kind on failure
    pub error_kind: Option<ErrorKind>,
}

impl DiffRecord {
    /// Successful record
    pub fn ok(
        block_index: usize,
        module_path: impl Into<PathBuf>,
        message: impl Into<String>,
        unified_diff: Option<String>,
    ) -> Self {
        Self {
            block_index,
            ok: true,
            message: message.into(),
            unified_diff,
            module_path: Some(module_path.into()),
            error_kind: None,
        }
    }

    /// Failed record
    #[must_use]
    pub fn failed(block_index: usize, module_path: Option<PathBuf>, error: &EngineError) -> Self {
        Self {
            block_index,
            ok: false,
            message: error.to_string(),
            unified_diff: None,
            module_path,
            error_kind: Some(error.kind()),
        }
    }
}

/// Result of one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Records in block order
    pub records: Vec<DiffRecord>,
    /// Stopped through the cancellation token
    pub cancelled: bool,
    /// Stopped by strict parsing after a failed block
    pub aborted: bool,
}

impl RunReport {
    /// Start a new report
    #[must_use]
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            records: Vec::new(),
            cancelled: false,
            aborted: false,
        }
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Number of failed records
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.ok).count()
    }

    /// Whether every record succeeded
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit code: failed block count, clamped to 255
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.failed_count()).unwrap_or(u8::MAX)
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns the serializer error, which only happens on non-string map keys.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Unified diff between two versions of a module, empty when equal
#[must_use]
pub fn unified_diff(path: &Path, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let name = path.display().to_string();
    similar::TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}
