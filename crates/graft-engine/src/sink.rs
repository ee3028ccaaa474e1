//! Event sink
//!
//! The engine never logs through a global: the [`Controller`](crate::Controller)
//! receives an [`EventSink`] at construction and hands a [`BlockLog`] to the
//! integrator and remover for every block.
//!
//! - DEBUG: per-node operations
//! - INFO: per-block outcomes
//! - WARN: tolerated anomalies (missing removal targets, formatter failures)
//! - ERROR: block failures

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Per-node operations
    Debug,
    /// Per-block outcomes
    Info,
    /// Tolerated anomalies
    Warn,
    /// Block failures
    Error,
}

impl Display for EventLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// One engine event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineEvent {
    /// Severity
    pub level: EventLevel,
    /// Block being processed, if any
    pub block_index: Option<usize>,
    /// Human-readable message
    pub message: String,
}

/// Destination for engine events
pub trait EventSink: Send + Sync {
    /// Record an event
    fn record(&self, event: EngineEvent);

    /// Flush buffered events; called at the end of every run
    fn flush(&self) {}
}

/// Forwards events to `tracing` at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: EngineEvent) {
        let block = event.block_index;
        match event.level {
            EventLevel::Debug => tracing::debug!(block, "{}", event.message),
            EventLevel::Info => tracing::info!(block, "{}", event.message),
            EventLevel::Warn => tracing::warn!(block, "{}", event.message),
            EventLevel::Error => tracing::error!(block, "{}", event.message),
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
    flushes: Mutex<usize>,
}

impl MemorySink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Messages recorded at `level`
    #[must_use]
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Number of completed flushes
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }

    fn flush(&self) {
        *self.flushes.lock() += 1;
    }
}

/// Sink handle bound to one block
#[derive(Clone, Copy)]
pub struct BlockLog<'a> {
    sink: &'a dyn EventSink,
    block: Option<usize>,
}

impl<'a> BlockLog<'a> {
    /// Events for block `block`
    #[must_use]
    pub fn new(sink: &'a dyn EventSink, block: usize) -> Self {
        Self {
            sink,
            block: Some(block),
        }
    }

    /// Events not tied to a block
    #[must_use]
    pub fn run(sink: &'a dyn EventSink) -> Self {
        Self { sink, block: None }
    }

    /// Record at `level`
    pub fn log(&self, level: EventLevel, message: impl Into<String>) {
        self.sink.record(EngineEvent {
            level,
            block_index: self.block,
            message: message.into(),
        });
    }

    /// Record at DEBUG
    pub fn debug(&self, message: impl Into<String>) {
        self.log(EventLevel::Debug, message);
    }

    /// Record at INFO
    pub fn info(&self, message: impl Into<String>) {
        self.log(EventLevel::Info, message);
    }

    /// Record at WARN
    pub fn warn(&self, message: impl Into<String>) {
        self.log(EventLevel::Warn, message);
    }

    /// Record at ERROR
    pub fn error(&self, message: impl Into<String>) {
        self.log(EventLevel::Error, message);
    }
}

impl fmt::Debug for BlockLog<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLog").field("block", &self.block).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_collects_by_level() {
        let sink = MemorySink::new();
        let log = BlockLog::new(&sink, 3);
        log.debug("node replaced");
        log.warn("target missing");
        BlockLog::run(&sink).info("run finished");
        sink.flush();

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].block_index, Some(3));
        assert_eq!(events[2].block_index, None);
        assert_eq!(sink.messages(EventLevel::Warn), vec!["target missing"]);
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn tracing_sink_accepts_all_levels() {
        let sink = TracingSink;
        for level in [EventLevel::Debug, EventLevel::Info, EventLevel::Warn, EventLevel::Error] {
            sink.record(EngineEvent {
                level,
                block_index: Some(0),
                message: format!("{level} event"),
            });
        }
        sink.flush();
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(EventLevel::Debug < EventLevel::Error);
        assert_eq!(EventLevel::Warn.to_string(), "WARN");
    }
}
