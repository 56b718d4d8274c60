//! Journals: partitioned log sinks threaded through every pipeline context
//!
//! Every journal line is emitted as a `tracing` event carrying the partition
//! and the transaction id. A capturing journal also records the lines in
//! memory, which is how tests and audits inspect what a phase reported.
//! Logging never feeds back into results.

use crate::types::Hash256;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Log level for journal entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level - detailed information
    Debug,
    /// Info level - general information
    Info,
    /// Warning level - potential issues
    Warn,
    /// Error level - errors that occurred
    Error,
}

/// A captured journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub level: LogLevel,
    pub partition: String,
    pub tx_hash: Option<Hash256>,
    pub message: String,
}

/// Partitioned log sink. Cheap to clone; clones share the capture buffer.
#[derive(Debug, Clone)]
pub struct Journal {
    partition: Arc<str>,
    min_level: LogLevel,
    tx_hash: Option<Hash256>,
    capture: Option<Arc<Mutex<Vec<JournalEntry>>>>,
}

impl Journal {
    /// Journal that only forwards to `tracing`
    pub fn new(partition: &str) -> Self {
        Self {
            partition: Arc::from(partition),
            min_level: LogLevel::Trace,
            tx_hash: None,
            capture: None,
        }
    }

    /// Journal that also keeps every line in memory
    pub fn capturing(partition: &str) -> Self {
        Self {
            capture: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Self::new(partition)
        }
    }

    /// Only record lines at or above `level`
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Same sink, tagged with a transaction id
    pub fn with_tx(&self, tx_hash: Hash256) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            ..self.clone()
        }
    }

    /// Same sink under another partition name
    pub fn partition(&self, partition: &str) -> Self {
        Self {
            partition: Arc::from(partition),
            ..self.clone()
        }
    }

    pub fn partition_name(&self) -> &str {
        &self.partition
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if level < self.min_level {
            return;
        }
        let message = message.into();
        let tx = self.tx_hash.map(|h| h.to_string()).unwrap_or_default();
        let partition = &*self.partition;
        match level {
            LogLevel::Trace => tracing::trace!(partition, tx = %tx, "{}", message),
            LogLevel::Debug => tracing::debug!(partition, tx = %tx, "{}", message),
            LogLevel::Info => tracing::info!(partition, tx = %tx, "{}", message),
            LogLevel::Warn => tracing::warn!(partition, tx = %tx, "{}", message),
            LogLevel::Error => tracing::error!(partition, tx = %tx, "{}", message),
        }
        if let Some(capture) = &self.capture {
            capture.lock().push(JournalEntry {
                level,
                partition: partition.to_string(),
                tx_hash: self.tx_hash,
                message,
            });
        }
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Captured lines so far; empty for a non-capturing journal
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.capture
            .as_ref()
            .map(|c| c.lock().clone())
            .unwrap_or_default()
    }

    /// Filter entries by log level
    pub fn filter_by_level(&self, level: LogLevel) -> Vec<JournalEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    /// Filter entries by transaction id
    pub fn filter_by_transaction(&self, tx_hash: &Hash256) -> Vec<JournalEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.tx_hash.as_ref() == Some(tx_hash))
            .collect()
    }

    /// True if any captured line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Some(capture) = &self.capture {
            capture.lock().clear();
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new("Transactor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_basic() {
        let journal = Journal::capturing("Test");
        journal.info("Test message");

        let entries = journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Test message");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].partition, "Test");
    }

    #[test]
    fn test_min_level_filtering() {
        let journal = Journal::capturing("Test").with_min_level(LogLevel::Info);

        // Trace should be filtered out
        journal.trace("Trace message");
        journal.warn("Warn message");

        assert_eq!(journal.entries().len(), 1);
        assert_eq!(journal.filter_by_level(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn test_clones_share_buffer() {
        let journal = Journal::capturing("Test");
        let tx = Hash256([7u8; 32]);
        journal.with_tx(tx).debug("tagged");
        journal.partition("Other").debug("untagged");

        assert_eq!(journal.entries().len(), 2);
        assert_eq!(journal.filter_by_transaction(&tx).len(), 1);
        assert!(journal.contains("untagged"));

        journal.clear();
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_plain_journal_captures_nothing() {
        let journal = Journal::new("Test");
        journal.error("dropped");
        assert!(journal.entries().is_empty());
    }
}
