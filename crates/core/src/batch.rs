//! Positioned batches
//!
//! A [`SequencedBatch`] is created inside the sequencer's critical section
//! once a write has been admitted. It owns the producer's entries and the
//! contiguous position range assigned to them, and is handed to the log
//! storage as-is.

use crate::entry::Entry;
use crate::types::Position;

/// A contiguous range of positions assigned to one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedBatch {
    timestamp: i64,
    lowest_position: Position,
    source_position: Position,
    entries: Vec<Entry>,
}

impl SequencedBatch {
    /// Create a batch whose first entry sits at `lowest_position`
    ///
    /// `source_position` is the externally supplied causal source, used for
    /// every entry that does not reference an entry of this batch. The range
    /// must fit in the position space; the sequencer rejects batches that
    /// would run past `Position::MAX`.
    pub fn new(
        timestamp: i64,
        lowest_position: Position,
        source_position: Position,
        entries: Vec<Entry>,
    ) -> Self {
        debug_assert!(!entries.is_empty(), "sequenced batch must not be empty");
        debug_assert!(
            lowest_position
                .checked_add(entries.len() as Position)
                .is_some(),
            "sequenced batch overflows the position space"
        );
        Self {
            timestamp,
            lowest_position,
            source_position,
            entries,
        }
    }

    /// Wall-clock timestamp (millis) of the write
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Position of the first entry
    pub fn lowest_position(&self) -> Position {
        self.lowest_position
    }

    /// Position of the last entry
    pub fn highest_position(&self) -> Position {
        self.lowest_position + self.entries.len() as Position - 1
    }

    /// Externally supplied source position of the batch
    pub fn source_position(&self) -> Position {
        self.source_position
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry at `index`
    pub fn position_of(&self, index: usize) -> Position {
        self.lowest_position + index as Position
    }

    /// Source position of the entry at `index`
    ///
    /// An entry referencing an earlier entry of the same batch resolves to
    /// that entry's position; every other entry resolves to the batch's
    /// external source position.
    pub fn source_position_of(&self, index: usize) -> Position {
        match self.entries[index].source_index {
            Some(source) if source < index => self.position_of(source),
            _ => self.source_position,
        }
    }

    /// Iterate over `(position, entry)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, entry)| (self.position_of(i), entry))
    }

    /// Take back the entries, dropping the positions
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}
