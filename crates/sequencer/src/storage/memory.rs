//! In-memory log storage
//!
//! Serializes each batch into one contiguous byte buffer; a batch's address
//! is its byte offset. Completion is either immediate (inside `append`) or
//! driven by the caller, which allows tests to reorder commits and inject
//! write failures.

use super::{AppendListener, LogStorage, StorageError};
use parking_lot::Mutex;
use seqlog_core::{Position, SequencedBatch};
use seqlog_wire::serialize_batch;
use std::collections::VecDeque;

/// When appended batches are reported written and committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// `on_write` and `on_commit` fire before `append` returns
    #[default]
    Immediate,
    /// Completion waits for [`InMemoryLogStorage::complete_next`] and friends
    Manual,
}

/// Location of one stored batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendRecord {
    /// Lowest position in the batch
    pub lowest_position: Position,
    /// Highest position in the batch
    pub highest_position: Position,
    /// Byte offset of the batch
    pub address: u64,
    /// Framed length of the batch
    pub length: usize,
}

struct PendingCompletion {
    address: u64,
    listener: Box<dyn AppendListener>,
}

#[derive(Default)]
struct MemoryState {
    data: Vec<u8>,
    records: Vec<AppendRecord>,
    pending: VecDeque<PendingCompletion>,
    next_position: Option<Position>,
    closed: bool,
}

enum Completion {
    Deferred,
    Now(u64, Box<dyn AppendListener>),
    Failed(StorageError, Box<dyn AppendListener>),
}

/// Log storage backed by a byte vector
pub struct InMemoryLogStorage {
    mode: CompletionMode,
    state: Mutex<MemoryState>,
}

impl InMemoryLogStorage {
    /// Storage completing every append immediately
    pub fn new() -> Self {
        Self::with_mode(CompletionMode::Immediate)
    }

    /// Storage completing appends only on request
    pub fn manual() -> Self {
        Self::with_mode(CompletionMode::Manual)
    }

    /// Storage with the given completion mode
    pub fn with_mode(mode: CompletionMode) -> Self {
        Self {
            mode,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Completion mode
    pub fn mode(&self) -> CompletionMode {
        self.mode
    }

    /// Complete the oldest pending append
    ///
    /// Returns `false` if nothing is pending.
    pub fn complete_next(&self) -> bool {
        self.complete_at(0)
    }

    /// Complete the `index`-th pending append, oldest first
    pub fn complete_at(&self, index: usize) -> bool {
        let next = self.state.lock().pending.remove(index);
        match next {
            Some(pending) => {
                pending.listener.on_write(pending.address);
                pending.listener.on_commit(pending.address);
                true
            }
            None => false,
        }
    }

    /// Complete every pending append in order, returning how many
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    /// Fail the oldest pending append with `error`
    pub fn fail_next(&self, error: StorageError) -> bool {
        let next = self.state.lock().pending.pop_front();
        match next {
            Some(pending) => {
                pending.listener.on_write_error(&error);
                true
            }
            None => false,
        }
    }

    /// Number of appends waiting for completion
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Copy of every serialized byte stored so far
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// Every stored batch, in append order
    pub fn records(&self) -> Vec<AppendRecord> {
        self.state.lock().records.clone()
    }

    /// Refuse every further append with [`StorageError::Closed`]
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    fn store(
        &self,
        lowest_position: Position,
        highest_position: Position,
        batch: &SequencedBatch,
        listener: Box<dyn AppendListener>,
    ) -> Completion {
        let mut state = self.state.lock();
        if state.closed {
            return Completion::Failed(StorageError::Closed, listener);
        }
        if let Some(expected) = state.next_position {
            if lowest_position != expected {
                return Completion::Failed(
                    StorageError::NonContiguous {
                        expected,
                        actual: lowest_position,
                    },
                    listener,
                );
            }
        }
        if batch.lowest_position() != lowest_position
            || batch.highest_position() != highest_position
        {
            return Completion::Failed(
                StorageError::Rejected(format!(
                    "range {}..={} does not match batch {}..={}",
                    lowest_position,
                    highest_position,
                    batch.lowest_position(),
                    batch.highest_position()
                )),
                listener,
            );
        }

        let bytes = serialize_batch(batch);
        let address = state.data.len() as u64;
        state.data.extend_from_slice(&bytes);
        state.records.push(AppendRecord {
            lowest_position,
            highest_position,
            address,
            length: bytes.len(),
        });
        state.next_position = Some(highest_position + 1);

        match self.mode {
            CompletionMode::Immediate => Completion::Now(address, listener),
            CompletionMode::Manual => {
                state
                    .pending
                    .push_back(PendingCompletion { address, listener });
                Completion::Deferred
            }
        }
    }
}

impl Default for InMemoryLogStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStorage for InMemoryLogStorage {
    fn append(
        &self,
        lowest_position: Position,
        highest_position: Position,
        batch: SequencedBatch,
        listener: Box<dyn AppendListener>,
    ) {
        // listeners run after the state lock is released
        match self.store(lowest_position, highest_position, &batch, listener) {
            Completion::Deferred => {}
            Completion::Now(address, listener) => {
                listener.on_write(address);
                listener.on_commit(address);
            }
            Completion::Failed(error, listener) => listener.on_write_error(&error),
        }
    }
}
