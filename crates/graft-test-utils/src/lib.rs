//! Testing utilities for the graft workspace
//!
//! Temporary project trees and builders for LLM-style fenced blocks.

#![allow(missing_docs)]

use graft_engine::{Controller, EngineConfig, MemorySink, RunReport};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway project root
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Config rooted at this project with formatting off, so assertions see
    /// exactly what the merge produced
    pub fn config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_root_dir(self.root())
            .with_formatting(false)
    }

    pub fn controller(&self, config: EngineConfig) -> (Controller, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Controller::new(config, sink.clone()), sink)
    }

    /// Apply `llm_output` with [`TempProject::config`]
    pub fn apply(&self, llm_output: &str) -> RunReport {
        self.controller(self.config()).0.run_text(llm_output)
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

/// ```` ```python ```` fence whose first line names `module_path`
pub fn python_block(module_path: &str, body: &str) -> String {
    let mut out = format!("```python\n# {module_path}\n{body}");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

/// ```` ```json ```` fence around `body`
pub fn json_block(body: &str) -> String {
    format!("```json\n{body}\n```\n")
}

/// Removal fence for `(kind, name)` targets
pub fn removal_block(module_path: &str, targets: &[(&str, &str)]) -> String {
    let targets = targets
        .iter()
        .map(|(kind, name)| format!(r#"{{"type": "{kind}", "name": "{name}"}}"#))
        .collect::<Vec<_>>()
        .join(", ");
    json_block(&format!(
        r#"{{"module_path": "{module_path}", "targets": [{targets}]}}"#
    ))
}

/// Method region markers around `source`
pub fn method_region(source: &str) -> String {
    let mut out = format!("# BEGIN UPDATED METHOD\n{source}");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("# END UPDATED METHOD\n");
    out
}
