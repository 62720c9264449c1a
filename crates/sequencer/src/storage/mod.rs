//! Log storage contract
//!
//! The sequencer hands every accepted batch to a [`LogStorage`] together
//! with an [`AppendListener`]. The storage reports progress back through
//! the listener:
//!
//! | Callback | Meaning |
//! |----------|---------|
//! | `on_write` | batch is written locally at `address` |
//! | `on_commit` | batch is committed (replicated) |
//! | `on_write_error` | batch will never be written |
//!
//! `append` may invoke the listener synchronously, while the caller still
//! holds the sequencer's lock. Implementations must not hold their own
//! locks while calling a listener. The sequencer's listener parks a
//! synchronous failure and reports it to the
//! [`WriteErrorHandler`](crate::WriteErrorHandler) after the lock is released.

pub mod handoff;
pub mod memory;

pub use handoff::{BatchQueue, PendingAppend, StorageAppender};
pub use memory::{AppendRecord, CompletionMode, InMemoryLogStorage};

use seqlog_core::{Position, SequencedBatch};
use thiserror::Error;

/// Reasons a storage can fail an append
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O failure of the underlying medium
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The batch does not continue the stored range
    #[error("non-contiguous append: expected position {expected}, got {actual}")]
    NonContiguous {
        /// Next position the storage expected
        expected: Position,
        /// Lowest position of the rejected batch
        actual: Position,
    },

    /// The storage no longer accepts appends
    #[error("storage is closed")]
    Closed,

    /// The storage refused the batch
    #[error("append rejected: {0}")]
    Rejected(String),
}

impl Clone for StorageError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::NonContiguous { expected, actual } => Self::NonContiguous {
                expected: *expected,
                actual: *actual,
            },
            Self::Closed => Self::Closed,
            Self::Rejected(reason) => Self::Rejected(reason.clone()),
        }
    }
}

/// Progress callbacks for one appended batch
pub trait AppendListener: Send + Sync {
    /// The batch was written locally at `address`
    fn on_write(&self, address: u64);

    /// The batch at `address` was committed
    fn on_commit(&self, address: u64);

    /// The batch will never be written
    fn on_write_error(&self, error: &StorageError);
}

/// A replicated, append-only log accepting sequenced batches
pub trait LogStorage: Send + Sync {
    /// Append `batch`, covering `lowest_position..=highest_position`
    ///
    /// Calls are made in strictly increasing, contiguous position order.
    fn append(
        &self,
        lowest_position: Position,
        highest_position: Position,
        batch: SequencedBatch,
        listener: Box<dyn AppendListener>,
    );
}
