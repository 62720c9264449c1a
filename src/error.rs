//! Unified error type for seqlog.
//!
//! Wraps the errors of every layer so callers that drive the whole write
//! path (config, writes, storage, reading frames back) can use one type.

use seqlog_core::WriteFailure;
use seqlog_sequencer::{ConfigError, StorageError};
use seqlog_wire::FrameError;
use thiserror::Error;

/// All seqlog errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A write was rejected by the sequencer
    #[error(transparent)]
    Write(#[from] WriteFailure),

    /// A serialized frame could not be parsed
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Storage failed to write a batch
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error outside of storage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for seqlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Only flow-control rejections are: the same write may be admitted once
    /// earlier writes are acknowledged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Write(failure) if failure.is_retryable())
    }

    /// Check if the sequencer was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Write(WriteFailure::Closed))
    }

    /// The write rejection, if this is one.
    pub fn as_write_failure(&self) -> Option<&WriteFailure> {
        match self {
            Error::Write(failure) => Some(failure),
            _ => None,
        }
    }
}
