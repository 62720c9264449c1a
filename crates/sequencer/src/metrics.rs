//! Sequencer counters and position gauges

use seqlog_core::{Position, WriteFailure, NO_POSITION};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Lock-free counters updated on the write path and by storage listeners
#[derive(Debug)]
pub struct SequencerMetrics {
    batches_appended: AtomicU64,
    entries_appended: AtomicU64,
    bytes_appended: AtomicU64,
    rejected_closed: AtomicU64,
    rejected_invalid: AtomicU64,
    rejected_full: AtomicU64,
    write_errors: AtomicU64,
    last_written_position: AtomicI64,
    last_committed_position: AtomicI64,
}

/// Serializable snapshot of [`SequencerMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencerStats {
    /// Batches handed to storage
    pub batches_appended: u64,
    /// Entries handed to storage
    pub entries_appended: u64,
    /// Framed bytes handed to storage
    pub bytes_appended: u64,
    /// Writes rejected because the sequencer was closed
    pub rejected_closed: u64,
    /// Writes rejected as invalid
    pub rejected_invalid: u64,
    /// Writes rejected by flow control
    pub rejected_full: u64,
    /// Batches the storage failed to write
    pub write_errors: u64,
    /// Highest position reported written, `-1` if none
    pub last_written_position: Position,
    /// Highest position reported committed, `-1` if none
    pub last_committed_position: Position,
}

impl SequencerMetrics {
    /// All counters zero, both gauges at [`NO_POSITION`]
    pub fn new() -> Self {
        Self {
            batches_appended: AtomicU64::new(0),
            entries_appended: AtomicU64::new(0),
            bytes_appended: AtomicU64::new(0),
            rejected_closed: AtomicU64::new(0),
            rejected_invalid: AtomicU64::new(0),
            rejected_full: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            last_written_position: AtomicI64::new(NO_POSITION),
            last_committed_position: AtomicI64::new(NO_POSITION),
        }
    }

    /// Record one batch handed to storage
    pub fn observe_batch(&self, entries: usize, bytes: usize) {
        self.batches_appended.fetch_add(1, Ordering::Relaxed);
        self.entries_appended
            .fetch_add(entries as u64, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a rejected write
    pub fn observe_rejection(&self, failure: &WriteFailure) {
        let counter = match failure {
            WriteFailure::Closed => &self.rejected_closed,
            WriteFailure::InvalidArgument { .. } => &self.rejected_invalid,
            WriteFailure::Full { .. } => &self.rejected_full,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a storage write failure
    pub fn observe_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the written gauge to `position`; never lowers it
    pub fn observe_written(&self, position: Position) {
        self.last_written_position
            .fetch_max(position, Ordering::AcqRel);
    }

    /// Raise the committed gauge to `position`; never lowers it
    pub fn observe_committed(&self, position: Position) {
        self.last_committed_position
            .fetch_max(position, Ordering::AcqRel);
    }

    /// Highest position reported written
    pub fn last_written_position(&self) -> Position {
        self.last_written_position.load(Ordering::Acquire)
    }

    /// Highest position reported committed
    pub fn last_committed_position(&self) -> Position {
        self.last_committed_position.load(Ordering::Acquire)
    }

    /// Current values of every counter and gauge
    pub fn snapshot(&self) -> SequencerStats {
        SequencerStats {
            batches_appended: self.batches_appended.load(Ordering::Relaxed),
            entries_appended: self.entries_appended.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            rejected_closed: self.rejected_closed.load(Ordering::Relaxed),
            rejected_invalid: self.rejected_invalid.load(Ordering::Relaxed),
            rejected_full: self.rejected_full.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            last_written_position: self.last_written_position(),
            last_committed_position: self.last_committed_position(),
        }
    }
}

impl Default for SequencerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
