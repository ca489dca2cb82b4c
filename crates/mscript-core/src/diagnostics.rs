//! Diagnostic sinks
//!
//! The library never logs through ambient global state on its own: every
//! component that reports progress receives a [`DiagnosticSink`]. The usual
//! choice is [`TracingSink`], which forwards to whatever `tracing` subscriber
//! the application installed at start-up.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Byte-level traffic
    Trace,
    /// Per-line progress
    Debug,
    /// Session milestones
    Info,
    /// Recoverable oddities
    Warn,
    /// Failures
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Receiver for diagnostic messages
pub trait DiagnosticSink: Send + Sync {
    /// Record one message
    fn log(&self, level: Level, message: &str);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message)
    }
}

/// Forwards messages to `tracing` under the `mscript` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Trace => tracing::trace!(target: "mscript", "{message}"),
            Level::Debug => tracing::debug!(target: "mscript", "{message}"),
            Level::Info => tracing::info!(target: "mscript", "{message}"),
            Level::Warn => tracing::warn!(target: "mscript", "{message}"),
            Level::Error => tracing::error!(target: "mscript", "{message}"),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Keeps messages in memory, mostly for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.log(Level::Info, "first");
        sink.log(Level::Warn, "second");
        assert_eq!(
            sink.entries(),
            vec![
                (Level::Info, "first".to_string()),
                (Level::Warn, "second".to_string())
            ]
        );
        assert!(sink.contains(Level::Warn, "sec"));
        assert!(!sink.contains(Level::Info, "sec"));
    }

    #[test]
    fn test_shared_sink() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn DiagnosticSink> = sink.clone();
        shared.log(Level::Debug, "via arc");
        assert!(sink.contains(Level::Debug, "via arc"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Error);
        assert_eq!(Level::Warn.to_string(), "WARN");
    }
}
