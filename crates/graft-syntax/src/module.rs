//! Module tree: parse, unparse and locators
//!
//! A [`Module`] is the ordered list of top-level [`Node`]s of a Python
//! source file. Every node keeps its exact source lines, so untouched code
//! round-trips byte for byte; only the blank lines between top-level nodes
//! are re-derived on [`Module::unparse`].

use crate::error::SyntaxError;
use crate::node::{number_occurrences, Node, NodeKey, NodeKind};
use crate::parser::{
    definition_name, named_children, node_text, parse_checked, unwrap_decorated,
};
use crate::text::{dedent, indent_width, is_blank, is_comment_line, LineIndex};
use std::collections::HashSet;
use std::ops::Range;
use tree_sitter::Node as TsNode;

/// Parsed top-level structure of a Python module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    nodes: Vec<Node>,
}

impl Module {
    /// Parse source into a module
    ///
    /// # Errors
    /// Returns [`SyntaxError`] if the source contains any syntax error.
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let source = source.replace("\r\n", "\n");
        let tree = parse_checked(&source)?;
        let mut nodes = segment(tree.root_node(), &source);
        number_occurrences(&mut nodes);
        tracing::trace!(nodes = nodes.len(), "parsed module");
        Ok(Self { nodes })
    }

    /// Module without any statements
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a module from already parsed nodes
    #[inline]
    #[must_use]
    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        number_occurrences(&mut nodes);
        Self { nodes }
    }

    /// Top-level nodes in source order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Consume into nodes
    #[inline]
    #[must_use]
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Number of top-level nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the module has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether any top-level node has this key
    #[must_use]
    pub fn contains_key(&self, key: &NodeKey) -> bool {
        self.nodes.iter().any(|n| n.key() == key)
    }

    /// Render the module back to source
    ///
    /// Definitions are separated from their neighbours by two blank lines;
    /// other nodes keep the blank lines they had (at most two).
    #[must_use]
    pub fn unparse(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&Node> = None;
        for node in &self.nodes {
            if let Some(prev) = prev {
                let required = if prev.is_definition() || node.is_definition() { 2 } else { 0 };
                let blanks = node.blank_lines_before().max(required).min(2);
                out.push('\n');
                out.push_str(&"\n".repeat(blanks));
            }
            out.push_str(node.text());
            prev = Some(node);
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// First class named `name`, searching nested scopes too
    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<ClassLocation> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_comment() && node.text().contains(name))
            .find_map(|(i, node)| ClassLocation::locate(node.text(), name, i))
    }

    /// Top-level function named `name`
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_function_named(name))
    }

    /// Top-level simple assignments binding any of `names`, in order
    #[must_use]
    pub fn find_assignments(&self, names: &HashSet<&str>) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.targets().iter().any(|t| names.contains(t.as_str())))
            .collect()
    }

    /// Replace one node with whatever `text` parses into
    ///
    /// The first replacement node inherits the blank lines of the old one.
    ///
    /// # Errors
    /// Returns [`SyntaxError`] if `text` does not parse or `index` is out of range.
    pub fn replace_node_text(&self, index: usize, text: &str) -> Result<Self, SyntaxError> {
        let old = self.nodes.get(index).ok_or_else(|| {
            SyntaxError::UnexpectedShape(format!("node index {index} out of range"))
        })?;
        let mut replacement = Self::parse(text)?.into_nodes();
        if let Some(first) = replacement.first_mut() {
            *first = first.clone().with_blank_lines_before(old.blank_lines_before());
        }
        let mut nodes = self.nodes.clone();
        nodes.splice(index..=index, replacement);
        Ok(Self::from_nodes(nodes))
    }
}

/// Where a class lives and how its body is laid out
///
/// All byte ranges are relative to the text of the top-level node at
/// [`ClassLocation::node_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLocation {
    node_index: usize,
    body_indent: String,
    methods: Vec<(String, Range<usize>)>,
    body_end: usize,
    inline_body: Option<Range<usize>>,
}

impl ClassLocation {
    fn locate(text: &str, name: &str, node_index: usize) -> Option<Self> {
        let tree = parse_checked(text).ok()?;
        let class = find_class_node(tree.root_node(), name, text)?;
        let index = LineIndex::new(text);
        let body = class.child_by_field_name("body")?;
        let statements: Vec<_> = named_children(body)
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .collect();

        let line_start = index.start_of_line_at(class.start_byte());
        let class_indent = match &text[line_start..class.start_byte()] {
            prefix if is_blank(prefix) => prefix.to_string(),
            _ => " ".repeat(class.start_position().column),
        };
        let inline = body.start_position().row == class.start_position().row;
        let body_indent = match statements.first() {
            Some(first) if !inline => {
                text[index.start_of_line_at(first.start_byte())..first.start_byte()].to_string()
            }
            _ => format!("{class_indent}    "),
        };

        let methods = statements
            .iter()
            .filter(|stmt| unwrap_decorated(**stmt).kind() == "function_definition")
            .filter_map(|stmt| {
                let name = definition_name(*stmt, text)?;
                let start = index.start_of_line_at(stmt.start_byte());
                Some((name.to_string(), start..effective_end(*stmt, &index)))
            })
            .collect();
        let body_end = statements
            .last()
            .map_or(body.end_byte(), |last| effective_end(*last, &index));

        Some(Self {
            node_index,
            body_indent,
            methods,
            body_end,
            inline_body: inline.then(|| body.byte_range()),
        })
    }

    /// Index of the top-level node containing the class
    #[inline]
    #[must_use]
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// Indentation of statements in the class body
    #[inline]
    #[must_use]
    pub fn body_indent(&self) -> &str {
        &self.body_indent
    }

    /// Method names in body order
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(name, _)| name.as_str())
    }

    /// Whole-line range of a method (decorators included)
    #[must_use]
    pub fn method_range(&self, name: &str) -> Option<Range<usize>> {
        self.methods
            .iter()
            .find(|(method, _)| method == name)
            .map(|(_, range)| range.clone())
    }

    /// End of the last line of the last body statement
    #[inline]
    #[must_use]
    pub fn body_end(&self) -> usize {
        self.body_end
    }

    /// Range of the body when it sits on the header line (`class A: pass`)
    #[inline]
    #[must_use]
    pub fn inline_body(&self) -> Option<Range<usize>> {
        self.inline_body.clone()
    }
}

/// A single function definition parsed from standalone source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    name: String,
    text: String,
}

impl FunctionSource {
    /// Parse method source; its first statement must be a function definition
    ///
    /// # Errors
    /// Returns [`SyntaxError`] if the source does not parse or does not start
    /// with a function definition.
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let module = Module::parse(&dedent(source))?;
        let first = module
            .nodes()
            .iter()
            .find(|n| !n.is_comment())
            .ok_or_else(|| SyntaxError::UnexpectedShape("no function definition".into()))?;
        match first.kind() {
            NodeKind::Function { name } => Ok(Self {
                name: name.clone(),
                text: first.text().to_string(),
            }),
            other => Err(SyntaxError::UnexpectedShape(format!(
                "expected a function definition, found {other:?}"
            ))),
        }
    }

    /// Function name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dedented source text, without trailing newline
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

fn find_class_node<'t>(node: TsNode<'t>, name: &str, source: &str) -> Option<TsNode<'t>> {
    if node.kind() == "class_definition"
        && node
            .child_by_field_name("name")
            .is_some_and(|n| node_text(n, source) == name)
    {
        return Some(node);
    }
    named_children(node)
        .into_iter()
        .find_map(|child| find_class_node(child, name, source))
}

/// Statement span before it becomes a node
struct Span {
    first_row: usize,
    last_row: usize,
    kind: NodeKind,
    key: NodeKey,
}

fn segment(root: TsNode<'_>, source: &str) -> Vec<Node> {
    let index = LineIndex::new(source);
    let mut spans: Vec<Span> = Vec::new();

    for child in named_children(root) {
        if child.kind() == "comment" {
            continue;
        }
        let first_row = child.start_position().row;
        let end_row = last_row(child, &index);
        // `a = 1; b = 2` shares a line: keep it one node
        if let Some(prev) = spans.last_mut() {
            if first_row <= prev.last_row {
                prev.last_row = prev.last_row.max(end_row);
                continue;
            }
        }
        let (kind, key) = classify(child, source, spans.is_empty());
        spans.push(Span {
            first_row,
            last_row: end_row,
            kind,
            key,
        });
    }

    let mut nodes = Vec::with_capacity(spans.len());
    let mut next_row = 0;
    for span in spans {
        let (text_row, blanks) = consume_gap(&mut nodes, &index, next_row, span.first_row);
        let text = rows_text(&index, text_row, span.last_row);
        nodes.push(Node::new(span.kind, span.key, text, blanks));
        next_row = span.last_row + 1;
    }
    let (open_row, open_blanks) = consume_gap(&mut nodes, &index, next_row, index.len());
    if open_row < index.len() {
        let last = (open_row..index.len())
            .rev()
            .find(|row| !is_blank(index.line(*row)))
            .unwrap_or(open_row);
        nodes.push(comment_node(&index, open_row, last, open_blanks));
    }
    nodes
}

/// Walk the comment/blank lines between statements
///
/// Comment runs followed by a blank line become standalone comment nodes.
/// Returns the first row of the trailing comment run (attached to the next
/// statement), or `to` when there is none, plus the blank lines before it.
fn consume_gap(nodes: &mut Vec<Node>, index: &LineIndex<'_>, from: usize, to: usize) -> (usize, usize) {
    let mut blanks = 0;
    let mut run: Option<(usize, usize)> = None;
    for row in from..to {
        if is_blank(index.line(row)) {
            if let Some((start, run_blanks)) = run.take() {
                nodes.push(comment_node(index, start, row - 1, run_blanks));
            }
            blanks += 1;
        } else if run.is_none() {
            run = Some((row, blanks));
            blanks = 0;
        }
    }
    run.unwrap_or((to, blanks))
}

fn comment_node(index: &LineIndex<'_>, first: usize, last: usize, blanks: usize) -> Node {
    let text = rows_text(index, first, last);
    let key = NodeKey::digest("comment", &text);
    Node::new(NodeKind::Comment, key, text, blanks)
}

fn rows_text(index: &LineIndex<'_>, first: usize, last: usize) -> String {
    (first..=last)
        .map(|row| index.line(row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Last source row that belongs to a statement
///
/// tree-sitter sometimes folds comments that follow an indented block into
/// that block; trailing comment lines at or left of the statement's own
/// column belong to whatever comes next.
fn last_row(node: TsNode<'_>, index: &LineIndex<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    let mut last = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };
    while last > start.row {
        let line = index.line(last);
        if is_blank(line) || (is_comment_line(line) && indent_width(line) <= start.column) {
            last -= 1;
        } else {
            break;
        }
    }
    last
}

fn effective_end(node: TsNode<'_>, index: &LineIndex<'_>) -> usize {
    index.line_end(last_row(node, index))
}

fn classify(node: TsNode<'_>, source: &str, first_statement: bool) -> (NodeKind, NodeKey) {
    let text = node_text(node, source);
    match node.kind() {
        "class_definition" | "function_definition" | "decorated_definition" => {
            if let Some(name) = definition_name(node, source) {
                let kind = if unwrap_decorated(node).kind() == "class_definition" {
                    NodeKind::Class { name: name.to_string() }
                } else {
                    NodeKind::Function { name: name.to_string() }
                };
                return (kind, NodeKey::named(name));
            }
        }
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            return (NodeKind::Import, NodeKey::import(text));
        }
        "expression_statement" => {
            let children: Vec<_> = named_children(node)
                .into_iter()
                .filter(|n| n.kind() != "comment")
                .collect();
            if let [only] = children.as_slice() {
                if only.kind() == "assignment" {
                    if let Some(targets) = assignment_targets(*only, source) {
                        let key = NodeKey::targets(&targets);
                        return (NodeKind::Assignment { targets }, key);
                    }
                }
                if first_statement && matches!(only.kind(), "string" | "concatenated_string") {
                    return (NodeKind::Docstring, NodeKey::docstring());
                }
            }
        }
        _ => {}
    }
    (NodeKind::Other(node.kind()), NodeKey::digest(node.kind(), text))
}

/// Bare-identifier targets of `a = ...`, `a, b = ...`, `a = b = ...`, `a: T = ...`
fn assignment_targets(node: TsNode<'_>, source: &str) -> Option<Vec<String>> {
    let left = node.child_by_field_name("left")?;
    let mut targets = bare_identifiers(left, source)?;
    if let Some(right) = node.child_by_field_name("right") {
        if right.kind() == "assignment" {
            targets.extend(assignment_targets(right, source)?);
        }
    }
    Some(targets)
}

fn bare_identifiers(node: TsNode<'_>, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, source).to_string()]),
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut names = Vec::new();
            for child in named_children(node) {
                names.extend(bare_identifiers(child, source)?);
            }
            Some(names)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#""""Sample module."""
import os
from typing import (
    Any,
    Dict,
)

LIMIT = 10
a, b = 1, 2


# Helper used by the loader
def load(path):
    return open(path).read()


class Loader:
    def __init__(self):
        self.items = []

    def run(self):
        return load(os.getcwd())


if __name__ == "__main__":
    Loader().run()
"#;

    #[test]
    fn parse_classifies_top_level_nodes() {
        let module = Module::parse(SAMPLE).unwrap();
        let keys: Vec<_> = module.nodes().iter().map(|n| n.key().to_string()).collect();
        assert_eq!(keys[0], "docstring");
        assert_eq!(keys[1], "import os");
        assert_eq!(keys[2], "from typing import Any, Dict");
        assert_eq!(keys[3], "LIMIT");
        assert_eq!(keys[4], "a,b");
        assert_eq!(keys[5], "load");
        assert_eq!(keys[6], "Loader");
        assert!(keys[7].starts_with("if_statement@"));
        assert_eq!(module.len(), 8);
    }

    #[test]
    fn repeated_statements_get_distinct_keys() {
        let module = Module::parse("setup()\nX = 1\nsetup()\n\n# ----\n\nY = 2\n\n# ----\n").unwrap();
        let keys: Vec<_> = module.nodes().iter().map(|n| n.key().to_string()).collect();
        assert!(keys[0].ends_with("#0"));
        assert!(keys[2].ends_with("#1"));
        assert_eq!(keys[0].trim_end_matches("#0"), keys[2].trim_end_matches("#1"));
        let comments: Vec<_> = keys.iter().filter(|k| k.starts_with("comment@")).collect();
        assert_eq!(comments.len(), 2);
        assert_ne!(comments[0], comments[1]);
    }

    #[test]
    fn occurrence_numbers_follow_splices() {
        let module = Module::parse("setup()\nX = 1\nsetup()\n").unwrap();
        let second = module.nodes()[2].key().clone();
        let module = module.replace_node_text(0, "teardown()\n").unwrap();
        assert!(module.nodes()[0].key().as_str().ends_with("#0"));
        assert_ne!(module.nodes()[2].key(), &second);
        assert!(module.nodes()[2].key().as_str().ends_with("#0"));
    }

    #[test]
    fn leading_comment_attaches_to_definition() {
        let module = Module::parse(SAMPLE).unwrap();
        let load = module.find_function("load").unwrap();
        assert!(load.text().starts_with("# Helper used by the loader\ndef load(path):"));
        assert_eq!(load.blank_lines_before(), 2);
    }

    #[test]
    fn unparse_round_trips_pep8_source() {
        let module = Module::parse(SAMPLE).unwrap();
        assert_eq!(module.unparse(), SAMPLE);
    }

    #[test]
    fn unparse_inserts_blank_lines_around_definitions() {
        let module = Module::parse("import os\ndef f():\n    pass\nx = 1\n").unwrap();
        assert_eq!(module.unparse(), "import os\n\n\ndef f():\n    pass\n\n\nx = 1\n");
    }

    #[test]
    fn empty_source_is_empty_module() {
        let module = Module::parse("").unwrap();
        assert!(module.is_empty());
        assert_eq!(module.unparse(), "");
    }

    #[test]
    fn syntax_errors_are_rejected() {
        assert!(Module::parse("def broken(:\n    pass\n").is_err());
        assert!(Module::parse("class A:\nreturn 1\n").is_err());
    }

    #[test]
    fn standalone_comments_survive() {
        let source = "x = 1\n\n# trailing note\n";
        let module = Module::parse(source).unwrap();
        assert_eq!(module.len(), 2);
        assert!(module.nodes()[1].is_comment());
        assert_eq!(module.unparse(), "x = 1\n\n# trailing note\n");
    }

    #[test]
    fn comment_after_block_belongs_to_next_definition() {
        let source = "class A:\n    def f(self):\n        pass\n# about B\nclass B:\n    pass\n";
        let module = Module::parse(source).unwrap();
        assert_eq!(module.len(), 2);
        assert!(!module.nodes()[0].text().contains("about B"));
        assert!(module.nodes()[1].text().starts_with("# about B\nclass B:"));
    }

    #[test]
    fn same_line_comment_stays_with_statement() {
        let module = Module::parse("x = 1  # the answer\ny = 2\n").unwrap();
        assert_eq!(module.nodes()[0].text(), "x = 1  # the answer");
        assert_eq!(module.nodes()[1].key().as_str(), "y");
    }

    #[test]
    fn decorated_definitions_keyed_by_name() {
        let module = Module::parse("@dataclass\nclass Point:\n    x: int\n").unwrap();
        assert!(module.nodes()[0].is_class_named("Point"));
        assert!(module.nodes()[0].text().starts_with("@dataclass"));
    }

    #[test]
    fn chained_and_annotated_assignments() {
        let module = Module::parse("a = b = 0\nc: int = 3\nself_x.y = 4\n").unwrap();
        assert_eq!(module.nodes()[0].targets(), ["a".to_string(), "b".to_string()]);
        assert_eq!(module.nodes()[1].targets(), ["c".to_string()]);
        assert!(!module.nodes()[2].is_assignment());
    }

    #[test]
    fn find_assignments_by_name() {
        let module = Module::parse(SAMPLE).unwrap();
        let names: HashSet<&str> = ["b", "LIMIT", "missing"].into_iter().collect();
        let found = module.find_assignments(&names);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].key().as_str(), "LIMIT");
        assert_eq!(found[1].key().as_str(), "a,b");
    }

    #[test]
    fn find_function_is_top_level_only() {
        let module = Module::parse(SAMPLE).unwrap();
        assert!(module.find_function("load").is_some());
        assert!(module.find_function("run").is_none());
    }

    #[test]
    fn find_class_reports_methods() {
        let module = Module::parse(SAMPLE).unwrap();
        let location = module.find_class("Loader").unwrap();
        assert_eq!(location.node_index(), 6);
        assert_eq!(location.body_indent(), "    ");
        let names: Vec<_> = location.method_names().collect();
        assert_eq!(names, ["__init__", "run"]);

        let text = module.nodes()[6].text();
        let run = location.method_range("run").unwrap();
        assert_eq!(&text[run], "    def run(self):\n        return load(os.getcwd())");
        assert_eq!(location.body_end(), text.len());
    }

    #[test]
    fn find_class_walks_nested_scopes() {
        let source = "def factory():\n    class Inner:\n        def go(self):\n            pass\n    return Inner\n";
        let module = Module::parse(source).unwrap();
        let location = module.find_class("Inner").unwrap();
        assert_eq!(location.node_index(), 0);
        assert_eq!(location.body_indent(), "        ");
        assert!(location.method_range("go").is_some());
    }

    #[test]
    fn inline_class_body_detected() {
        let module = Module::parse("class Empty: pass\n").unwrap();
        let location = module.find_class("Empty").unwrap();
        assert_eq!(location.inline_body(), Some(13..17));
        assert_eq!(location.body_indent(), "    ");
    }

    #[test]
    fn replace_node_text_keeps_spacing() {
        let module = Module::parse("x = 1\n\ny = 2\n").unwrap();
        let updated = module.replace_node_text(1, "y = 3").unwrap();
        assert_eq!(updated.unparse(), "x = 1\n\ny = 3\n");
        assert!(module.replace_node_text(5, "z = 0").is_err());
    }

    #[test]
    fn function_source_requires_def() {
        let method = FunctionSource::parse("    def f(self):\n        return 42\n").unwrap();
        assert_eq!(method.name(), "f");
        assert_eq!(method.text(), "def f(self):\n    return 42");
        assert!(FunctionSource::parse("x = 1\n").is_err());
        assert!(FunctionSource::parse("").is_err());
    }

    #[test]
    fn crlf_sources_parse() {
        let module = Module::parse("x = 1\r\ny = 2\r\n").unwrap();
        assert_eq!(module.unparse(), "x = 1\ny = 2\n");
    }
}
