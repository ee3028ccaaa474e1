//! Extraction errors
//!
//! A fenced block that was recognised but cannot become an edit is kept as
//! [`EditBlock::Malformed`](crate::EditBlock::Malformed) so it can be reported.

/// Why a fenced block could not be turned into an edit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// Update block without a module path header, or removal without `module_path`
    #[error("block has no module path")]
    MissingModulePath,

    /// Removal block whose body yields no JSON object
    #[error("removal block is not a JSON object")]
    UnparseableJson,

    /// `targets` missing or not an array
    #[error("removal block has no `targets` array")]
    MissingTargets,

    /// `targets` is an empty array
    #[error("removal block has an empty `targets` array")]
    EmptyTargets,

    /// Target entry with a `type` outside class/function/variable
    #[error("unknown removal target type `{kind}`")]
    UnknownTargetKind {
        /// The rejected type string
        kind: String,
    },

    /// Target entry that is not an object with string `type` and `name`
    #[error("removal target #{index} is invalid: {reason}")]
    InvalidTarget {
        /// 0-based position in `targets`
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// `# BEGIN UPDATED METHOD` without a matching end marker
    #[error("updated method region opened at line {line} is never closed")]
    UnterminatedRegion {
        /// 1-based line inside the block
        line: usize,
    },

    /// Updated method region that contains no `def`
    #[error("updated method region at line {line} contains no function definition")]
    RegionWithoutFunction {
        /// 1-based line inside the block
        line: usize,
    },
}

impl ExtractionError {
    /// Create an invalid-target error
    pub fn invalid_target(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            index,
            reason: reason.into(),
        }
    }
}
