//! Error types for the syntax facade
//!
//! Provides error handling for:
//! - Parse operations (source → [`Module`](crate::Module))
//! - Compile-only validation of final source
//! - Formatting (non-fatal for callers)

/// Errors while parsing Python source into a module tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// The tree-sitter grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// The parser produced no tree at all
    #[error("parse failed")]
    ParseFailed,

    /// Source contains an error or missing node
    #[error("syntax error at {line}:{column}: {message}")]
    Invalid {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What the parser choked on
        message: String,
    },

    /// Source parsed, but not into the expected shape
    #[error("unexpected structure: {0}")]
    UnexpectedShape(String),
}

impl SyntaxError {
    /// Create an invalid-syntax error at a 0-based tree-sitter position
    pub fn at(point: tree_sitter::Point, message: impl Into<String>) -> Self {
        Self::Invalid {
            line: point.row + 1,
            column: point.column + 1,
            message: message.into(),
        }
    }
}

/// Post-transform source failed the compile-only check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Built-in grammar check rejected the source
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    /// External validator rejected the source
    #[error("validator `{command}` rejected source: {message}")]
    Rejected {
        /// Program that was run
        command: String,
        /// Its diagnostic output
        message: String,
    },

    /// External validator could not be run
    #[error("validator `{command}` failed to run: {message}")]
    Spawn {
        /// Program that was run
        command: String,
        /// OS error text
        message: String,
    },
}

/// Formatter failure (callers downgrade this to a warning)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Source could not be parsed for canonical formatting
    #[error("cannot format unparseable source: {0}")]
    Unparseable(#[from] SyntaxError),

    /// External formatter exited unsuccessfully
    #[error("formatter `{command}` failed: {message}")]
    CommandFailed {
        /// Program that was run
        command: String,
        /// Its diagnostic output
        message: String,
    },

    /// External formatter produced non UTF-8 output
    #[error("formatter `{0}` produced invalid UTF-8")]
    InvalidOutput(String),

    /// No formatter command configured
    #[error("empty formatter command")]
    EmptyCommand,
}
