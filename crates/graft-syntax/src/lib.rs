//! Graft Syntax
//!
//! Python syntax facade over tree-sitter. Higher layers merge code through
//! this crate only; grammar node kinds never leak out of it.
//!
//! # Core Concepts
//!
//! - [`Module`]: Ordered top-level [`Node`]s; `parse` then `unparse` keeps
//!   untouched nodes byte for byte
//! - [`NodeKind`] / [`NodeKey`]: Closed classification and merge identity
//! - [`ClassLocation`]: Method ranges and body indentation of a class
//! - [`split_header`] / [`reattach`]: Leading comment preservation
//! - [`SyntaxValidator`]: Compile-only check of final text
//! - [`Formatter`]: Optional canonical formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_syntax::{Module, SyntaxValidator, TreeSitterValidator};
//!
//! let module = Module::parse("import os\nx = 1\n")?;
//! assert_eq!(module.len(), 2);
//! TreeSitterValidator.validate(&module.unparse())?;
//! ```

#![warn(unreachable_pub)]

mod comments;
mod error;
mod format;
mod module;
mod node;
mod parser;
mod text;
mod validate;

pub use comments::{reattach, split_header, Header};
pub use error::{FormatError, SyntaxError, ValidationError};
pub use format::{CanonicalFormatter, CommandFormatter, Formatter};
pub use module::{ClassLocation, FunctionSource, Module};
pub use node::{Node, NodeKey, NodeKind};
pub use text::{collapse_whitespace, dedent, indent, indent_width, is_blank, is_comment_line};
pub use validate::{CommandValidator, SyntaxValidator, TreeSitterValidator, ValidatorChain};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        split_header, reattach, CanonicalFormatter, ClassLocation, Formatter, FunctionSource,
        Module, Node, NodeKey, NodeKind, SyntaxValidator, TreeSitterValidator,
    };
}
