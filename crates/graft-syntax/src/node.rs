//! Top-level module nodes
//!
//! A [`Node`] is one top-level statement of a module together with the
//! comment lines directly above it. Higher layers only see [`NodeKind`] and
//! the typed predicates; tree-sitter kind names never leave this crate.

use crate::text::collapse_whitespace;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Closed set of top-level node kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `class NAME ...` (optionally decorated)
    Class {
        /// Class name
        name: String,
    },
    /// `def NAME ...` / `async def NAME ...` (optionally decorated)
    Function {
        /// Function name
        name: String,
    },
    /// Simple assignment whose targets are all bare identifiers
    Assignment {
        /// Target identifiers, left to right
        targets: Vec<String>,
    },
    /// `import ...`, `from ... import ...`
    Import,
    /// String literal as the first statement of the module
    Docstring,
    /// Comment lines standing on their own
    Comment,
    /// Any other statement, tagged with its grammar kind
    Other(&'static str),
}

/// Canonical identity of a top-level node, used for merge decisions
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(String);

impl NodeKey {
    pub(crate) fn named(name: &str) -> Self {
        Self(name.to_string())
    }

    pub(crate) fn targets(targets: &[String]) -> Self {
        Self(targets.join(","))
    }

    pub(crate) fn import(statement: &str) -> Self {
        Self(normalize_import(statement))
    }

    pub(crate) fn docstring() -> Self {
        Self("docstring".to_string())
    }

    /// Content-derived key: kind plus a digest of the normalized text
    ///
    /// [`number_occurrences`] appends `#n` once the node sits in a module.
    pub(crate) fn digest(kind: &str, text: &str) -> Self {
        let hash = blake3::hash(collapse_whitespace(text).as_bytes());
        Self(format!("{kind}@{}", hex::encode(&hash.as_bytes()[..8])))
    }

    /// Key without its occurrence suffix
    fn base(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(base, _)| base)
    }

    /// Key as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number content-keyed nodes (`kind@digest#n`) by occurrence in `nodes`
///
/// Equal pass-through statements and comments stay distinct, while the n-th
/// copy in an incoming block still matches the n-th copy in the module.
pub(crate) fn number_occurrences(nodes: &mut [Node]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for node in nodes
        .iter_mut()
        .filter(|n| matches!(n.kind, NodeKind::Other(_) | NodeKind::Comment))
    {
        let base = node.key.base().to_string();
        let count = seen.entry(base.clone()).or_insert(0);
        node.key = NodeKey(format!("{base}#{count}"));
        *count += 1;
    }
}

/// Normalized textual form of an import statement
///
/// Line continuations, grouping parentheses, trailing commas and spacing
/// differences do not change the key.
fn normalize_import(statement: &str) -> String {
    let flat = statement
        .replace("\\\n", " ")
        .replace(['(', ')'], " ")
        .replace(',', ", ");
    let collapsed = collapse_whitespace(&flat).replace(" ,", ",");
    collapsed.trim_end_matches(',').trim_end().to_string()
}

/// One top-level statement with its attached leading comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    key: NodeKey,
    text: String,
    blank_lines_before: usize,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, key: NodeKey, text: String, blank_lines_before: usize) -> Self {
        Self {
            kind,
            key,
            text,
            blank_lines_before: blank_lines_before.min(2),
        }
    }

    /// Node kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Merge identity
    #[inline]
    #[must_use]
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// Exact source lines of the node, without trailing newline
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Blank lines that preceded the node in its source (at most 2)
    #[inline]
    #[must_use]
    pub fn blank_lines_before(&self) -> usize {
        self.blank_lines_before
    }

    /// Same node with a different preceding blank-line count
    #[must_use]
    pub fn with_blank_lines_before(mut self, count: usize) -> Self {
        self.blank_lines_before = count.min(2);
        self
    }

    /// Class or function name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Class { name } | NodeKind::Function { name } => Some(name),
            _ => None,
        }
    }

    /// Assignment targets (empty for non-assignments)
    #[must_use]
    pub fn targets(&self) -> &[String] {
        match &self.kind {
            NodeKind::Assignment { targets } => targets,
            _ => &[],
        }
    }

    /// Whether this is a class definition
    #[inline]
    #[must_use]
    pub fn is_class(&self) -> bool {
        matches!(self.kind, NodeKind::Class { .. })
    }

    /// Whether this is a function definition
    #[inline]
    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self.kind, NodeKind::Function { .. })
    }

    /// Class or function definition
    #[inline]
    #[must_use]
    pub fn is_definition(&self) -> bool {
        self.is_class() || self.is_function()
    }

    /// Whether this is a simple assignment
    #[inline]
    #[must_use]
    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, NodeKind::Assignment { .. })
    }

    /// Whether this is an import statement
    #[inline]
    #[must_use]
    pub fn is_import(&self) -> bool {
        matches!(self.kind, NodeKind::Import)
    }

    /// Whether this is a standalone comment run
    #[inline]
    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, NodeKind::Comment)
    }

    /// Whether this is the module docstring
    #[inline]
    #[must_use]
    pub fn is_docstring(&self) -> bool {
        matches!(self.kind, NodeKind::Docstring)
    }

    /// Whether this is a class named `name`
    #[must_use]
    pub fn is_class_named(&self, name: &str) -> bool {
        self.is_class() && self.name() == Some(name)
    }

    /// Whether this is a function named `name`
    #[must_use]
    pub fn is_function_named(&self, name: &str) -> bool {
        self.is_function() && self.name() == Some(name)
    }

    /// Whether this assignment binds `name`
    #[must_use]
    pub fn assigns(&self, name: &str) -> bool {
        self.targets().iter().any(|t| t == name)
    }
}
