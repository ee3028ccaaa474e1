//! Header comment preservation
//!
//! The leading comment block of a module (license banners, shebangs,
//! `# path/to/module.py` markers) is split off textually before parsing and
//! put back verbatim after unparsing.

use crate::text::{is_blank, is_comment_line};

/// A module split into its header comments and the remaining body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Header lines, verbatim (blank lines between comments included)
    pub comments: Vec<String>,
    /// Everything after the header
    pub body: String,
}

impl Header {
    /// Whether the source had no header comments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Split leading comment lines from the rest of the source
///
/// Leading blank lines are skipped. The header then runs over comment and
/// blank lines and ends at the last comment line before the first line of
/// code; blank lines after that comment belong to the body.
#[must_use]
pub fn split_header(source: &str) -> Header {
    let lines: Vec<&str> = source.lines().collect();
    let first = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());

    let mut last_comment = None;
    for (row, line) in lines.iter().enumerate().skip(first) {
        if is_comment_line(line) {
            last_comment = Some(row);
        } else if !is_blank(line) {
            break;
        }
    }

    let Some(last) = last_comment else {
        return Header {
            comments: Vec::new(),
            body: source.to_string(),
        };
    };

    let comments = lines[first..=last].iter().map(|l| (*l).to_string()).collect();
    let mut body = lines[last + 1..].join("\n");
    if !body.is_empty() && source.ends_with('\n') {
        body.push('\n');
    }
    Header { comments, body }
}

/// Prepend header comments to an unparsed body
///
/// Comments are joined by newlines and followed by a single newline.
#[must_use]
pub fn reattach(comments: &[String], body: &str) -> String {
    if comments.is_empty() {
        return body.to_string();
    }
    let mut out = comments.join("\n");
    out.push('\n');
    out.push_str(body);
    out
}
