//! tree-sitter plumbing shared by the module facade, validator and formatter

use crate::error::SyntaxError;
use tree_sitter::{Node as TsNode, Parser, Tree};

/// Parse Python source, tolerating errors in the resulting tree
pub(crate) fn parse_tree(source: &str) -> Result<Tree, SyntaxError> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| SyntaxError::ParserInit(e.to_string()))?;
    parser.parse(source, None).ok_or(SyntaxError::ParseFailed)
}

/// Parse Python source and reject any tree containing error or missing nodes
pub(crate) fn parse_checked(source: &str) -> Result<Tree, SyntaxError> {
    let tree = parse_tree(source)?;
    match first_error(tree.root_node(), source) {
        Some(err) => Err(err),
        None => Ok(tree),
    }
}

/// Locate the first (preorder) error or missing node below `node`
pub(crate) fn first_error(node: TsNode<'_>, source: &str) -> Option<SyntaxError> {
    if node.is_missing() {
        return Some(SyntaxError::at(
            node.start_position(),
            format!("missing `{}`", node.kind()),
        ));
    }
    if node.is_error() {
        let snippet = node_text(node, source)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        return Some(SyntaxError::at(
            node.start_position(),
            format!("unexpected `{snippet}`"),
        ));
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| first_error(child, source))
        // has_error() with no offending descendant found
        .or_else(|| Some(SyntaxError::at(node.start_position(), "invalid syntax")))
}

/// What encloses a statement, as far as the compiler cares
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    function: bool,
    looping: bool,
}

/// Locate the first construct the grammar accepts but `compile()` rejects
///
/// Covers Python 2 `print`/`exec` statements, `return`, `yield` and `await`
/// outside a function, and `break`/`continue` outside a loop.
pub(crate) fn first_compile_error(node: TsNode<'_>) -> Option<SyntaxError> {
    check_scope(node, Scope::default())
}

fn check_scope(node: TsNode<'_>, scope: Scope) -> Option<SyntaxError> {
    let message = match node.kind() {
        "print_statement" => Some("`print` statement is Python 2 syntax"),
        "exec_statement" => Some("`exec` statement is Python 2 syntax"),
        "return_statement" if !scope.function => Some("`return` outside function"),
        "yield" if node.is_named() && !scope.function => Some("`yield` outside function"),
        "await" if node.is_named() && !scope.function => Some("`await` outside function"),
        "break_statement" if !scope.looping => Some("`break` outside loop"),
        "continue_statement" if !scope.looping => Some("`continue` not properly in loop"),
        _ => None,
    };
    if let Some(message) = message {
        return Some(SyntaxError::at(node.start_position(), message));
    }

    let inner = match node.kind() {
        "function_definition" | "lambda" => Scope {
            function: true,
            looping: false,
        },
        "class_definition" => Scope::default(),
        _ => scope,
    };
    let loop_body = match node.kind() {
        "for_statement" | "while_statement" => node.child_by_field_name("body"),
        _ => None,
    };
    named_children(node).into_iter().find_map(|child| {
        let scope = if Some(child) == loop_body {
            Scope {
                looping: true,
                ..inner
            }
        } else {
            inner
        };
        check_scope(child, scope)
    })
}

/// Source text covered by a node
#[inline]
pub(crate) fn node_text<'s>(node: TsNode<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Named children of a node, comments included
pub(crate) fn named_children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Name of a class or function definition, looking through decorators
pub(crate) fn definition_name<'s>(node: TsNode<'_>, source: &'s str) -> Option<&'s str> {
    let def = unwrap_decorated(node);
    match def.kind() {
        "class_definition" | "function_definition" => def
            .child_by_field_name("name")
            .map(|name| node_text(name, source)),
        _ => None,
    }
}

/// The inner definition of a `decorated_definition`, or the node itself
pub(crate) fn unwrap_decorated(node: TsNode<'_>) -> TsNode<'_> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}
