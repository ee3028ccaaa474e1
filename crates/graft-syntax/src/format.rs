//! Canonical formatting of final module text
//!
//! Formatting is optional and never fatal: callers fall back to the
//! unformatted text when a formatter fails.

use crate::comments::{reattach, split_header};
use crate::error::FormatError;
use crate::module::Module;
use crate::parser::{named_children, parse_checked};
use crate::text::is_blank;
use crate::validate::run_with_stdin;
use std::collections::HashSet;
use tree_sitter::Node as TsNode;

/// Source formatter
pub trait Formatter: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Format source text
    ///
    /// # Errors
    /// Returns [`FormatError`] when the source cannot be formatted.
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Built-in whitespace normalizer
///
/// - top-level spacing re-derived through parse/unparse
/// - trailing whitespace stripped (string literal contents untouched)
/// - runs of more than two blank lines collapsed
/// - exactly one trailing newline
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn name(&self) -> &str {
        "canonical"
    }

    fn format(&self, source: &str) -> Result<String, FormatError> {
        let source = source.replace("\r\n", "\n");
        let header = split_header(&source);
        let mut body = Module::parse(&header.body)?.unparse();
        let gap = header.body.lines().take_while(|l| is_blank(l)).count().min(2);
        if !header.is_empty() && !body.is_empty() && gap > 0 {
            body.insert_str(0, &"\n".repeat(gap));
        }
        let text = reattach(&header.comments, &body);

        let tree = parse_checked(&text)?;
        let mut protected = HashSet::new();
        collect_string_rows(tree.root_node(), &mut protected);

        let mut lines: Vec<&str> = Vec::new();
        let mut blank_run = 0;
        for (row, line) in text.lines().enumerate() {
            if protected.contains(&row) {
                blank_run = 0;
                lines.push(line);
                continue;
            }
            let line = line.trim_end();
            if is_blank(line) {
                blank_run += 1;
                if blank_run > 2 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            lines.push(line);
        }
        while lines.last().is_some_and(|l| is_blank(l)) {
            lines.pop();
        }

        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Rows whose line ending falls inside a multi-line string literal
fn collect_string_rows(node: TsNode<'_>, rows: &mut HashSet<usize>) {
    if node.kind() == "string" {
        let (start, end) = (node.start_position().row, node.end_position().row);
        rows.extend(start..end);
        return;
    }
    for child in named_children(node) {
        collect_string_rows(child, rows);
    }
}

/// External formatter fed through stdin, e.g. `["ruff", "format", "-"]`
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    argv: Vec<String>,
}

impl CommandFormatter {
    /// Create a formatter running `argv[0]` with the remaining arguments
    #[must_use]
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Formatter for CommandFormatter {
    fn name(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    fn format(&self, source: &str) -> Result<String, FormatError> {
        let (program, args) = self.argv.split_first().ok_or(FormatError::EmptyCommand)?;
        let output = run_with_stdin(program, args, source).map_err(|e| FormatError::CommandFailed {
            command: program.clone(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(FormatError::CommandFailed {
                command: program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let formatted =
            String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput(program.clone()))?;
        if formatted.trim().is_empty() && !source.trim().is_empty() {
            return Err(FormatError::CommandFailed {
                command: program.clone(),
                message: "formatter produced no output".into(),
            });
        }
        Ok(formatted)
    }
}
