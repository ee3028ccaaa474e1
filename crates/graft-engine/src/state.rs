//! Per-block module state

use crate::error::EngineError;
use graft_syntax::{is_blank, reattach, split_header, Module};
use std::path::PathBuf;

/// A target module loaded for one block
///
/// Header comments are split off before parsing and put back by
/// [`ModuleState::render`].
#[derive(Debug, Clone)]
pub struct ModuleState {
    /// Resolved path
    pub path: PathBuf,
    /// Text as read (or synthesized), line endings untouched
    pub original_text: String,
    /// Leading comment lines
    pub initial_comments: Vec<String>,
    /// Text after the header, LF line endings
    pub body_text: String,
    /// Blank lines between the header and the first statement
    pub header_gap: usize,
    /// Parsed body
    pub tree: Module,
    /// Whether the original used CRLF line endings
    pub crlf: bool,
    /// Whether the file existed on disk
    pub on_disk: bool,
}

impl ModuleState {
    /// Split and parse module text
    ///
    /// # Errors
    /// Returns [`EngineError::Parse`] if the body does not parse.
    pub fn load(path: PathBuf, original_text: String, on_disk: bool) -> Result<Self, EngineError> {
        let crlf = original_text.contains("\r\n");
        let normalized = original_text.replace("\r\n", "\n");
        let header = split_header(&normalized);
        let header_gap = header.body.lines().take_while(|l| is_blank(l)).count();
        let tree = Module::parse(&header.body)
            .map_err(|e| EngineError::parse(format!("existing module {}", path.display()), e))?;
        Ok(Self {
            path,
            original_text,
            initial_comments: header.comments,
            body_text: header.body,
            header_gap,
            tree,
            crlf,
            on_disk,
        })
    }

    /// Text to compare against when building the diff
    #[must_use]
    pub fn diff_base(&self) -> &str {
        if self.on_disk {
            &self.original_text
        } else {
            ""
        }
    }

    /// Unparse `tree` and put the header back
    #[must_use]
    pub fn render(&self, tree: &Module) -> String {
        let body = tree.unparse();
        if body.is_empty() || self.header_gap == 0 {
            return reattach(&self.initial_comments, &body);
        }
        let gap = "\n".repeat(self.header_gap);
        reattach(&self.initial_comments, &format!("{gap}{body}"))
    }

    /// Restore the original line endings
    #[must_use]
    pub fn restore_line_endings(&self, text: String) -> String {
        if self.crlf {
            text.replace("\r\n", "\n").replace('\n', "\r\n")
        } else {
            text
        }
    }
}
