//! Error types for the engine
//!
//! Provides error handling for:
//! - Block extraction (malformed blocks)
//! - File I/O and path resolution
//! - Parsing of existing modules, incoming code and method sources
//! - Method integration
//! - Validation and formatting of final text
//! - Configuration loading
//!
//! Every error raised while processing a block ends up in that block's
//! [`DiffRecord`](crate::DiffRecord); only configuration and input loading
//! reach the caller.

use graft_extract::ExtractionError;
use graft_syntax::{FormatError, SyntaxError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Block could not be turned into an edit
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Reading or writing a file failed
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Target module does not exist and may not be created
    #[error("module {} does not exist", path.display())]
    MissingModule {
        /// Resolved module path
        path: PathBuf,
    },

    /// Module path escapes the project root or is otherwise unusable
    #[error("invalid module path `{path}`: {reason}")]
    InvalidPath {
        /// Path as written in the block
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Existing or incoming source does not parse
    #[error("{what} does not parse: {source}")]
    Parse {
        /// Which source failed
        what: String,
        /// Parser diagnostic
        #[source]
        source: SyntaxError,
    },

    /// Named class not found for method integration
    #[error("class `{class}` not found in module")]
    ClassNotFound {
        /// Class name from the block
        class: String,
    },

    /// Method regions present but the block names no class
    #[error("updated methods {methods:?} given without a class")]
    MethodsWithoutClass {
        /// Method names from the block
        methods: Vec<String>,
    },

    /// Final text failed the compile-only check
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Formatter failed (downgraded to a warning by the controller)
    #[error("formatting failed: {0}")]
    Format(#[from] FormatError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for the source described by `what`
    pub fn parse(what: impl Into<String>, source: SyntaxError) -> Self {
        Self::Parse {
            what: what.into(),
            source,
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Closed error kind for reports
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Io { .. } | Self::MissingModule { .. } | Self::InvalidPath { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::ClassNotFound { .. } | Self::MethodsWithoutClass { .. } => ErrorKind::Integration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Format(_) => ErrorKind::Format,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Closed set of error kinds reported per block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed block
    Extraction,
    /// File system problem or missing module
    Io,
    /// Source does not parse
    Parse,
    /// Method integration failed
    Integration,
    /// Final text rejected
    Validation,
    /// Formatter failed
    Format,
    /// Bad configuration
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "ExtractionError",
            Self::Io => "IoError",
            Self::Parse => "ParseError",
            Self::Integration => "IntegrationError",
            Self::Validation => "ValidationError",
            Self::Format => "FormatError",
            Self::Config => "ConfigError",
        };
        f.write_str(name)
    }
}
