//! Remover: drop named top-level definitions

use crate::sink::BlockLog;
use graft_extract::{RemovalTarget, TargetKind};
use graft_syntax::{Module, Node};

/// Outcome of applying removal targets to a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Module without the removed nodes
    pub module: Module,
    /// Nodes removed per target, in target order
    pub counts: Vec<(RemovalTarget, usize)>,
}

impl Removal {
    /// Total number of removed nodes
    #[must_use]
    pub fn removed(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

/// Deletes classes, functions and assignments by name
#[derive(Debug, Clone, Copy)]
pub struct Remover<'a> {
    log: BlockLog<'a>,
}

impl<'a> Remover<'a> {
    /// Create a remover reporting to `log`
    #[must_use]
    pub fn new(log: BlockLog<'a>) -> Self {
        Self { log }
    }

    /// Remove every target from the top level of `module`
    ///
    /// - class: class definitions with that name (decorated included)
    /// - function: function definitions with that name
    /// - variable: assignments binding that name among their targets
    ///
    /// A target that matches nothing is reported at WARN; it is not an error.
    #[must_use]
    pub fn remove(&self, module: &Module, targets: &[RemovalTarget]) -> Removal {
        let mut nodes: Vec<Node> = module.nodes().to_vec();
        let mut counts = Vec::with_capacity(targets.len());

        for target in targets {
            let before = nodes.len();
            nodes.retain(|node| !matches(node, target));
            let removed = before - nodes.len();
            if removed == 0 {
                self.log.warn(format!("{target} not found; nothing to remove"));
            } else {
                self.log.debug(format!("removed {target} ({removed} node(s))"));
            }
            counts.push((target.clone(), removed));
        }

        Removal {
            module: Module::from_nodes(nodes),
            counts,
        }
    }
}

fn matches(node: &Node, target: &RemovalTarget) -> bool {
    match target.kind {
        TargetKind::Class => node.is_class_named(&target.name),
        TargetKind::Function => node.is_function_named(&target.name),
        TargetKind::Variable => node.assigns(&target.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{EventLevel, MemorySink};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "import os\n\nLIMIT = 10\na, b = 1, 2\n\n\n@cache\ndef foo():\n    return 1\n\n\ndef bar():\n    return 2\n\n\nclass X:\n    pass\n";

    #[test]
    fn removes_function_and_keeps_siblings() {
        let sink = MemorySink::new();
        let module = Module::parse(SOURCE).unwrap();
        let removal = Remover::new(BlockLog::new(&sink, 0))
            .remove(&module, &[RemovalTarget::new(TargetKind::Function, "foo")]);
        assert_eq!(removal.removed(), 1);
        assert!(removal.module.find_function("foo").is_none());
        assert!(removal.module.find_function("bar").is_some());
        assert!(!removal.module.unparse().contains("@cache"));
    }

    #[test]
    fn removes_class_and_tuple_variable() {
        let sink = MemorySink::new();
        let module = Module::parse(SOURCE).unwrap();
        let removal = Remover::new(BlockLog::new(&sink, 0)).remove(
            &module,
            &[
                RemovalTarget::new(TargetKind::Class, "X"),
                RemovalTarget::new(TargetKind::Variable, "b"),
            ],
        );
        assert_eq!(
            removal.module.unparse(),
            "import os\n\nLIMIT = 10\n\n\n@cache\ndef foo():\n    return 1\n\n\ndef bar():\n    return 2\n"
        );
        assert_eq!(removal.counts.iter().map(|(_, n)| *n).collect::<Vec<_>>(), vec![1, 1]);
    }

    #[test]
    fn kind_must_match() {
        let sink = MemorySink::new();
        let module = Module::parse(SOURCE).unwrap();
        let removal = Remover::new(BlockLog::new(&sink, 4))
            .remove(&module, &[RemovalTarget::new(TargetKind::Class, "foo")]);
        assert_eq!(removal.removed(), 0);
        assert_eq!(removal.module, module);
        assert_eq!(sink.messages(EventLevel::Warn), vec!["class foo not found; nothing to remove"]);
    }
}
