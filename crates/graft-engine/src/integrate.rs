//! Integrator: merge incoming code into an existing module
//!
//! Three pure transformations, driven by the controller in this order:
//!
//! 1. [`Integrator::merge_imports`]: dedupe the leading import region and
//!    insert incoming imports the module does not have yet
//! 2. [`Integrator::merge_nodes`]: replace top-level nodes by key, append
//!    the rest
//! 3. [`Integrator::integrate_methods`]: replace or append methods of one
//!    class

use crate::error::EngineError;
use crate::sink::BlockLog;
use graft_syntax::{indent, FunctionSource, Module, Node, NodeKey};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Merges incoming code into an existing module
#[derive(Debug, Clone, Copy)]
pub struct Integrator<'a> {
    log: BlockLog<'a>,
}

impl<'a> Integrator<'a> {
    /// Create an integrator reporting to `log`
    #[must_use]
    pub fn new(log: BlockLog<'a>) -> Self {
        Self { log }
    }

    /// Merge import statements
    ///
    /// Duplicates inside the leading import region are dropped. Incoming
    /// imports whose key is absent from `existing` are inserted after the
    /// last import of that region (after the docstring, or at the top, when
    /// the region has no imports). `__future__` imports go to the start of
    /// the region.
    #[must_use]
    pub fn merge_imports(&self, existing: &Module, incoming: &Module) -> Module {
        let nodes = existing.nodes();
        let start = usize::from(nodes.first().is_some_and(Node::is_docstring));
        let region_end = nodes[start..]
            .iter()
            .take_while(|n| n.is_import() || n.is_comment())
            .enumerate()
            .filter(|(_, n)| n.is_import())
            .map(|(i, _)| start + i + 1)
            .last()
            .unwrap_or(start);

        let mut seen: HashSet<&NodeKey> = HashSet::new();
        let mut region = Vec::new();
        for node in &nodes[start..region_end] {
            if node.is_import() && !seen.insert(node.key()) {
                self.log.debug(format!("dropping duplicate import `{}`", node.key()));
                continue;
            }
            region.push(node.clone());
        }

        let mut future = Vec::new();
        let mut added = Vec::new();
        for node in incoming.nodes().iter().filter(|n| n.is_import()) {
            if existing.contains_key(node.key())
                || future.iter().chain(&added).any(|n: &Node| n.key() == node.key())
            {
                continue;
            }
            self.log.debug(format!("adding import `{}`", node.key()));
            let node = node.clone().with_blank_lines_before(0);
            if node.key().as_str().starts_with("from __future__ ") {
                future.push(node);
            } else {
                added.push(node);
            }
        }

        let inserted = !future.is_empty() || !added.is_empty();
        let region_was_empty = region_end == start;
        let mut merged: Vec<Node> = nodes[..start].to_vec();
        merged.extend(future);
        merged.extend(region);
        merged.extend(added);
        let mut rest = nodes[region_end..].iter().cloned();
        if inserted && region_was_empty {
            if let Some(next) = rest.next() {
                let blanks = next.blank_lines_before().max(1);
                merged.push(next.with_blank_lines_before(blanks));
            }
        }
        merged.extend(rest);
        Module::from_nodes(merged)
    }

    /// Merge top-level nodes by key
    ///
    /// The first existing node with a matching key is replaced in place and
    /// keeps its preceding blank lines; later existing duplicates of that key
    /// are dropped. Unmatched incoming nodes are appended in incoming order
    /// (a module docstring goes first). Among incoming duplicates the last
    /// definition wins at the first position. Imports are left to
    /// [`Integrator::merge_imports`].
    #[must_use]
    pub fn merge_nodes(&self, existing: &Module, incoming: &Module) -> Module {
        let mut pending: IndexMap<&NodeKey, &Node> = IndexMap::new();
        for node in incoming.nodes().iter().filter(|n| !n.is_import()) {
            pending.insert(node.key(), node);
        }

        let mut used: HashSet<&NodeKey> = HashSet::new();
        let mut merged: Vec<Node> = Vec::with_capacity(existing.len() + pending.len());
        for node in existing.nodes() {
            match pending.get(node.key()) {
                Some(new) if used.insert(node.key()) => {
                    if new.text() != node.text() {
                        self.log.debug(format!("replacing `{}`", node.key()));
                    }
                    merged.push((*new).clone().with_blank_lines_before(node.blank_lines_before()));
                }
                Some(_) => self.log.debug(format!("dropping duplicate `{}`", node.key())),
                None => merged.push(node.clone()),
            }
        }

        for (key, node) in pending {
            if used.contains(key) {
                continue;
            }
            self.log.debug(format!("adding `{key}`"));
            if node.is_docstring() {
                merged.insert(0, node.clone().with_blank_lines_before(0));
            } else {
                merged.push(node.clone());
            }
        }
        Module::from_nodes(merged)
    }

    /// Replace or append methods of class `class`
    ///
    /// Each source must start with a (possibly decorated) function
    /// definition. A method with the same name is replaced in place;
    /// otherwise the method is appended after the last body statement,
    /// separated by one blank line. Sources are re-indented to the class body.
    ///
    /// # Errors
    /// [`EngineError::ClassNotFound`] if the module has no such class,
    /// [`EngineError::Parse`] if a method source is not a function definition.
    pub fn integrate_methods(
        &self,
        module: &Module,
        class: &str,
        methods: &IndexMap<String, String>,
    ) -> Result<Module, EngineError> {
        let mut module = module.clone();
        for (name, source) in methods {
            let method = FunctionSource::parse(source)
                .map_err(|e| EngineError::parse(format!("method `{name}`"), e))?;
            module = self.integrate_method(&module, class, &method)?;
        }
        Ok(module)
    }

    fn integrate_method(
        &self,
        module: &Module,
        class: &str,
        method: &FunctionSource,
    ) -> Result<Module, EngineError> {
        let location = module.find_class(class).ok_or_else(|| EngineError::ClassNotFound {
            class: class.to_string(),
        })?;
        let text = module.nodes()[location.node_index()].text();
        let body = indent(method.text(), location.body_indent());

        let updated = if let Some(range) = location.method_range(method.name()) {
            self.log.debug(format!("replacing method `{class}.{}`", method.name()));
            format!("{}{body}{}", &text[..range.start], &text[range.end..])
        } else if let Some(inline) = location.inline_body() {
            self.log.debug(format!("expanding `{class}` to add method `{}`", method.name()));
            let statement = text[inline.clone()].trim();
            let header = text[..inline.start].trim_end();
            let tail = &text[inline.end..];
            if matches!(statement, "pass" | "...") {
                format!("{header}\n{body}{tail}")
            } else {
                let indent_str = location.body_indent();
                format!("{header}\n{indent_str}{statement}\n\n{body}{tail}")
            }
        } else {
            self.log.debug(format!("appending method `{class}.{}`", method.name()));
            let end = location.body_end();
            format!("{}\n\n{body}{}", &text[..end], &text[end..])
        };

        module
            .replace_node_text(location.node_index(), &updated)
            .map_err(|e| EngineError::parse(format!("class `{class}` after method update"), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{EventLevel, MemorySink};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Module {
        Module::parse(source).unwrap()
    }

    fn methods(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn imports_inserted_after_leading_region() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("\"\"\"Doc.\"\"\"\nimport os\nimport os\n\nX = 1\n");
        let incoming = parse("import os\nimport sys\nfrom typing import Any\n");

        let merged = integrator.merge_imports(&existing, &incoming);
        assert_eq!(
            merged.unparse(),
            "\"\"\"Doc.\"\"\"\nimport os\nimport sys\nfrom typing import Any\n\nX = 1\n"
        );
        assert!(sink
            .messages(EventLevel::Debug)
            .contains(&"dropping duplicate import `import os`".to_string()));
    }

    #[test]
    fn imports_go_to_top_without_region() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let merged = integrator.merge_imports(&parse("X = 1\n"), &parse("import os\n"));
        assert_eq!(merged.unparse(), "import os\n\nX = 1\n");

        let merged = integrator.merge_imports(&parse("\"\"\"Doc.\"\"\"\n"), &parse("import os\n"));
        assert_eq!(merged.unparse(), "\"\"\"Doc.\"\"\"\nimport os\n");
    }

    #[test]
    fn future_imports_lead_the_region() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let merged = integrator.merge_imports(
            &parse("import os\n"),
            &parse("from __future__ import annotations\nimport os\n"),
        );
        assert_eq!(merged.unparse(), "from __future__ import annotations\nimport os\n");
    }

    #[test]
    fn merge_nodes_replaces_in_place_and_appends() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("A = 1\n\n\ndef f():\n    return 0\n\n\nB = 2\n");
        let incoming = parse("def g():\n    return 2\n\n\ndef f():\n    return 1\n");

        let merged = integrator.merge_nodes(&existing, &incoming);
        assert_eq!(
            merged.unparse(),
            "A = 1\n\n\ndef f():\n    return 1\n\n\nB = 2\n\n\ndef g():\n    return 2\n"
        );
    }

    #[test]
    fn merge_nodes_drops_existing_duplicates_of_replaced_key() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("X = 1\nY = 2\nX = 3\n");
        let merged = integrator.merge_nodes(&existing, &parse("X = 9\n"));
        assert_eq!(merged.unparse(), "X = 9\nY = 2\n");
    }

    #[test]
    fn incoming_duplicates_last_wins() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let incoming = parse("def h():\n    return 1\n\n\nZ = 0\n\n\ndef h():\n    return 2\n");
        let merged = integrator.merge_nodes(&Module::empty(), &incoming);
        assert_eq!(merged.unparse(), "def h():\n    return 2\n\n\nZ = 0\n");
    }

    #[test]
    fn incoming_docstring_goes_first() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let merged = integrator.merge_nodes(&parse("X = 1\n"), &parse("\"\"\"New doc.\"\"\"\n"));
        assert!(merged.nodes()[0].is_docstring());
        assert_eq!(merged.unparse(), "\"\"\"New doc.\"\"\"\nX = 1\n");
    }

    #[test]
    fn method_replaced_in_place() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("class A:\n    def f(self):\n        return 0\n\n    def g(self):\n        return 2\n");
        let merged = integrator
            .integrate_methods(&existing, "A", &methods(&[("f", "def f(self):\n    return 42\n")]))
            .unwrap();
        assert_eq!(
            merged.unparse(),
            "class A:\n    def f(self):\n        return 42\n\n    def g(self):\n        return 2\n"
        );
    }

    #[test]
    fn method_appended_with_blank_line() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("class A:\n    x = 1\n\n\nY = 2\n");
        let merged = integrator
            .integrate_methods(&existing, "A", &methods(&[("h", "@staticmethod\ndef h():\n    pass\n")]))
            .unwrap();
        assert_eq!(
            merged.unparse(),
            "class A:\n    x = 1\n\n    @staticmethod\n    def h():\n        pass\n\n\nY = 2\n"
        );
    }

    #[test]
    fn method_into_inline_class_body() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let merged = integrator
            .integrate_methods(&parse("class A: pass\n"), "A", &methods(&[("f", "def f(self):\n    return 1\n")]))
            .unwrap();
        assert_eq!(merged.unparse(), "class A:\n    def f(self):\n        return 1\n");
    }

    #[test]
    fn method_into_nested_class() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("def make():\n    class Inner:\n        def go(self):\n            return 0\n    return Inner\n");
        let merged = integrator
            .integrate_methods(&existing, "Inner", &methods(&[("go", "def go(self):\n    return 1\n")]))
            .unwrap();
        assert_eq!(
            merged.unparse(),
            "def make():\n    class Inner:\n        def go(self):\n            return 1\n    return Inner\n"
        );
    }

    #[test]
    fn missing_class_is_integration_error() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let err = integrator
            .integrate_methods(&parse("X = 1\n"), "A", &methods(&[("f", "def f(self):\n    pass\n")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::ClassNotFound { .. }));
    }

    #[test]
    fn method_source_must_be_a_function() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let err = integrator
            .integrate_methods(&parse("class A:\n    pass\n"), "A", &methods(&[("f", "x = 1\n")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let sink = MemorySink::new();
        let integrator = Integrator::new(BlockLog::new(&sink, 0));
        let existing = parse("import os\n\n\nclass A:\n    pass\n\n\nif __name__ == \"__main__\":\n    A()\n");
        let incoming = parse("import sys\n\n\nclass A:\n    def run(self):\n        return sys.argv\n\n\nif __name__ == \"__main__\":\n    A()\n");

        let apply = |module: &Module| {
            let merged = integrator.merge_imports(module, &incoming);
            integrator.merge_nodes(&merged, &incoming)
        };
        let once = apply(&existing);
        let twice = apply(&parse(&once.unparse()));
        assert_eq!(once.unparse(), twice.unparse());
    }
}
