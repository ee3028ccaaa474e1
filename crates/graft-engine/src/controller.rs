//! Controller: drives extraction and every block through
//! read → parse → transform → validate → format → write
//!
//! Blocks run strictly in order, so later blocks see the files written by
//! earlier ones. Each block commits or fails on its own; failures become
//! [`DiffRecord`]s and never abort the run unless strict parsing is on.

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fs::FileStore;
use crate::integrate::Integrator;
use crate::remove::Remover;
use crate::report::{unified_diff, DiffRecord, RunReport};
use crate::sink::{BlockLog, EventSink, TracingSink};
use crate::state::ModuleState;
use graft_extract::{BlockExtractor, EditBlock, ExtractedBlock, RemovalBlock, UpdateBlock};
use graft_syntax::{
    is_blank, reattach, split_header, Formatter, Module, SyntaxValidator, ValidatorChain,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Why a block stopped early
enum Interrupt {
    Failed(EngineError),
    Cancelled,
}

impl From<EngineError> for Interrupt {
    fn from(err: EngineError) -> Self {
        Self::Failed(err)
    }
}

/// A block that went through
struct Applied {
    path: PathBuf,
    message: String,
    diff: Option<String>,
}

/// Applies LLM output to a project tree
pub struct Controller {
    config: EngineConfig,
    store: FileStore,
    extractor: BlockExtractor,
    validators: ValidatorChain,
    formatter: Option<Box<dyn Formatter>>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl Controller {
    /// Create a controller reporting to `sink`
    #[must_use]
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Self {
        let store = FileStore::new(config.root_dir.clone()).with_backup(config.enable_backup);
        Self {
            validators: config.validators(),
            formatter: config.formatter(),
            store,
            extractor: BlockExtractor::new(),
            sink,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Create a controller logging through `tracing`
    #[must_use]
    pub fn with_tracing(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(TracingSink))
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read the configured input file and apply it
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the input file cannot be read. Block
    /// failures are reported in the returned [`RunReport`].
    pub fn run(&self) -> Result<RunReport, EngineError> {
        let input = &self.config.input_file;
        let text = std::fs::read_to_string(input).map_err(|e| EngineError::io(input, e))?;
        Ok(self.run_text(&text))
    }

    /// Apply LLM output text
    #[must_use]
    pub fn run_text(&self, text: &str) -> RunReport {
        let mut report = RunReport::start();
        let span = tracing::info_span!("run", run_id = %report.run_id);
        let _guard = span.enter();
        let run_log = BlockLog::run(self.sink.as_ref());

        let blocks = self.extractor.extract(text);
        run_log.info(format!("extracted {} block(s)", blocks.len()));

        for block in &blocks {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let log = BlockLog::new(self.sink.as_ref(), block.index);
            match self.process(block, log) {
                Ok(applied) => {
                    log.info(format!("{}: {}", applied.path.display(), applied.message));
                    report
                        .records
                        .push(DiffRecord::ok(block.index, applied.path, applied.message, applied.diff));
                }
                Err(Interrupt::Failed(err)) => {
                    log.error(format!("{} block failed: {err}", block.block.label()));
                    let path = block.module_path().and_then(|p| self.store.resolve(p).ok());
                    report.records.push(DiffRecord::failed(block.index, path, &err));
                    if self.config.strict_parsing {
                        run_log.warn("strict parsing: aborting after failed block");
                        report.aborted = true;
                        break;
                    }
                }
                Err(Interrupt::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
            }
        }

        if report.cancelled {
            run_log.warn(format!("run cancelled after {} record(s)", report.records.len()));
        }
        report.finish();
        run_log.info(format!(
            "{} block(s) processed, {} failed",
            report.records.len(),
            report.failed_count()
        ));
        self.sink.flush();
        report
    }

    fn process(&self, block: &ExtractedBlock, log: BlockLog<'_>) -> Result<Applied, Interrupt> {
        match &block.block {
            EditBlock::Update(update) => self.process_update(update, log),
            EditBlock::Removal(removal) => self.process_removal(removal, log),
            EditBlock::Malformed(err) => Err(EngineError::from(err.clone()).into()),
        }
    }

    fn process_update(&self, update: &UpdateBlock, log: BlockLog<'_>) -> Result<Applied, Interrupt> {
        let path = self.store.resolve(&update.module_path)?;
        for hint in &update.imports_hint {
            log.debug(format!("import hint (advisory, not merged): {hint}"));
        }

        let on_disk = self.store.exists(&path);
        let original = if on_disk {
            self.store.read(&path)?
        } else if self.config.create_missing_modules {
            log.info(format!("{} does not exist; starting from template", path.display()));
            self.store.create_module_template(&update.module_path)
        } else {
            return Err(EngineError::MissingModule { path }.into());
        };

        self.checkpoint()?;
        let state = ModuleState::load(path, original, on_disk)?;
        let (incoming_body, dropped) = strip_incoming_header(&update.code_body);
        if dropped > 0 {
            log.debug(format!("ignoring {dropped} incoming header line(s)"));
        }
        let incoming = Module::parse(&incoming_body)
            .map_err(|e| EngineError::parse("incoming code", e))?;

        self.checkpoint()?;
        let integrator = Integrator::new(log);
        let merged = integrator.merge_imports(&state.tree, &incoming);
        let mut merged = integrator.merge_nodes(&merged, &incoming);
        if !update.updated_methods.is_empty() {
            let class = update.class_name.as_deref().ok_or_else(|| {
                EngineError::MethodsWithoutClass {
                    methods: update.updated_methods.keys().cloned().collect(),
                }
            })?;
            merged = integrator.integrate_methods(&merged, class, &update.updated_methods)?;
        }

        let verb = if on_disk { "updated" } else { "created" };
        self.commit(&state, &merged, log, verb)
    }

    fn process_removal(&self, removal: &RemovalBlock, log: BlockLog<'_>) -> Result<Applied, Interrupt> {
        let path = self.store.resolve(&removal.module_path)?;
        if !self.store.exists(&path) {
            return Err(EngineError::MissingModule { path }.into());
        }
        let original = self.store.read(&path)?;

        self.checkpoint()?;
        let state = ModuleState::load(path, original, true)?;

        self.checkpoint()?;
        let outcome = Remover::new(log).remove(&state.tree, &removal.targets);
        let found = outcome.counts.iter().filter(|(_, n)| *n > 0).count();
        let message = format!("removed {found} of {} target(s)", removal.targets.len());
        self.commit(&state, &outcome.module, log, &message)
    }

    /// Render, validate, format and write a transformed module
    fn commit(
        &self,
        state: &ModuleState,
        tree: &Module,
        log: BlockLog<'_>,
        message: &str,
    ) -> Result<Applied, Interrupt> {
        let mut text = state.render(tree);

        self.checkpoint()?;
        self.validators.validate(&text).map_err(EngineError::from)?;
        if let Some(formatter) = &self.formatter {
            match formatter.format(&text) {
                Ok(formatted) => match self.validators.validate(&formatted) {
                    Ok(()) => text = formatted,
                    Err(err) => log.warn(format!(
                        "formatter `{}` produced invalid code ({err}); keeping unformatted text",
                        formatter.name()
                    )),
                },
                Err(err) => log.warn(format!(
                    "{}; keeping unformatted text",
                    EngineError::from(err)
                )),
            }
        }
        let text = state.restore_line_endings(text);

        if state.on_disk && text == state.original_text {
            return Ok(Applied {
                path: state.path.clone(),
                message: "unchanged".to_string(),
                diff: None,
            });
        }
        let label = state.path.strip_prefix(self.store.root()).unwrap_or(state.path.as_path());
        let diff = unified_diff(label, state.diff_base(), &text);

        self.checkpoint()?;
        if self.config.dry_run {
            log.info(format!("dry run: {} not written", state.path.display()));
        } else if let Some(backup) = self.store.write(&state.path, &text)? {
            log.debug(format!("backup written to {}", backup.display()));
        }
        Ok(Applied {
            path: state.path.clone(),
            message: message.to_string(),
            diff: Some(diff),
        })
    }

    fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Drop the header comments of an incoming code body
///
/// The comment run sitting directly on the first statement documents that
/// statement and stays; everything above the last blank line of the header
/// is dropped. Returns the remaining body and the number of dropped lines.
fn strip_incoming_header(code_body: &str) -> (String, usize) {
    let header = split_header(code_body);
    let attached = if header.body.lines().next().is_some_and(|l| !is_blank(l)) {
        header.comments.iter().rev().take_while(|l| !is_blank(l)).count()
    } else {
        0
    };
    let dropped = header.comments.len() - attached;
    (reattach(&header.comments[dropped..], &header.body), dropped)
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sink::{EventLevel, MemorySink};
    use pretty_assertions::assert_eq;
    use std::fs;

    fn controller(root: &std::path::Path) -> (Controller, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = EngineConfig::new().with_root_dir(root);
        (Controller::new(config, sink.clone()), sink)
    }

    #[test]
    fn malformed_block_becomes_failed_record() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, sink) = controller(dir.path());
        let report = controller.run_text("```python\nprint('no path')\n```\n");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].error_kind, Some(ErrorKind::Extraction));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(sink.messages(EventLevel::Error).len(), 1);
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn path_escape_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, _) = controller(dir.path());
        let report = controller.run_text("```python\n# ../evil.py\nx = 1\n```\n");
        assert_eq!(report.records[0].error_kind, Some(ErrorKind::Io));
        assert!(!dir.path().parent().unwrap().join("evil.py").exists());
    }

    #[test]
    fn import_hints_are_logged_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.py"), "x = 1\n").unwrap();
        let (controller, sink) = controller(dir.path());
        let report = controller.run_text("```python\n# m.py\n#¤# import json\ny = 2\n```\n");
        assert!(report.all_ok());
        assert_eq!(fs::read_to_string(dir.path().join("m.py")).unwrap(), "x = 1\ny = 2\n");
        assert!(sink
            .messages(EventLevel::Debug)
            .iter()
            .any(|m| m.contains("import hint (advisory, not merged): import json")));
    }

    #[test]
    fn methods_without_class_fail() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.py"), "class A:\n    pass\n").unwrap();
        let (controller, _) = controller(dir.path());
        let text = "```python\n# m.py\n# BEGIN UPDATED METHOD\ndef f(self):\n    pass\n# END UPDATED METHOD\n```\n";
        let report = controller.run_text(text);
        assert_eq!(report.records[0].error_kind, Some(ErrorKind::Integration));
    }

    #[test]
    fn run_reports_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::new()
            .with_root_dir(dir.path())
            .with_input_file(dir.path().join("missing.md"));
        let err = Controller::with_tracing(config).run().unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
