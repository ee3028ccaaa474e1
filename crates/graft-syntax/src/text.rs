//! Line-oriented text helpers
//!
//! Everything here is purely textual; structure comes from tree-sitter.

/// Byte offsets of line starts, for mapping tree-sitter rows onto text
#[derive(Debug, Clone)]
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    /// Number of lines (a trailing newline does not open a new line)
    pub(crate) fn len(&self) -> usize {
        if self.text.ends_with('\n') {
            self.starts.len() - 1
        } else {
            self.starts.len()
        }
    }

    pub(crate) fn line_start(&self, row: usize) -> usize {
        self.starts.get(row).copied().unwrap_or(self.text.len())
    }

    /// End of a line, excluding its newline
    pub(crate) fn line_end(&self, row: usize) -> usize {
        match self.starts.get(row + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        }
    }

    pub(crate) fn line(&self, row: usize) -> &'a str {
        &self.text[self.line_start(row)..self.line_end(row)]
    }

    /// Start of the line containing `byte`
    pub(crate) fn start_of_line_at(&self, byte: usize) -> usize {
        self.text[..byte].rfind('\n').map_or(0, |i| i + 1)
    }
}

/// Whether a line is empty or whitespace only
#[inline]
#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Whether a line is a `#` comment once left-trimmed
#[inline]
#[must_use]
pub fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Width of the leading whitespace of a line, in bytes
#[inline]
#[must_use]
pub fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Remove the common leading whitespace of all non-blank lines
///
/// Blank lines are emptied. The result ends with a newline when the input did.
#[must_use]
pub fn dedent(text: &str) -> String {
    let common = text
        .lines()
        .filter(|l| !is_blank(l))
        .map(|l| &l[..indent_width(l)])
        .reduce(common_prefix)
        .unwrap_or("")
        .len();

    let mut out: Vec<&str> = Vec::new();
    for line in text.lines() {
        if is_blank(line) {
            out.push("");
        } else {
            out.push(&line[common..]);
        }
    }
    let mut joined = out.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

fn common_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

/// Prefix every non-blank line with `prefix`; trailing newline is dropped
#[must_use]
pub fn indent(text: &str, prefix: &str) -> String {
    text.trim_end_matches('\n')
        .lines()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse all whitespace runs to a single space
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
