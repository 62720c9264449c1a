//! Sequencer and storage contract for seqlog
//!
//! This crate implements the ordering half of the write path:
//! - [`Sequencer`]: validates batches, assigns gap-free positions and
//!   consults flow control, all under one lock
//! - [`LogStorage`] / [`AppendListener`]: contract with the durable log
//! - [`InMemoryLogStorage`]: byte-vector storage with controllable completion
//! - [`BatchQueue`] / [`StorageAppender`]: pull-based hand-off to a
//!   dedicated storage thread
//! - [`SequencerMetrics`]: counters and position gauges
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use seqlog_core::{CommandType, Entry};
//! use seqlog_sequencer::{InMemoryLogStorage, Sequencer, SequencerConfig};
//!
//! let storage = Arc::new(InMemoryLogStorage::new());
//! let sequencer = Sequencer::new(&SequencerConfig::default(), storage).unwrap();
//!
//! let highest = sequencer
//!     .try_write(vec![Entry::new(1, "meta", "value")], -1, CommandType::UserCommand)
//!     .unwrap();
//! assert_eq!(highest, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod listener;
pub mod metrics;
pub mod sequencer;
pub mod storage;

pub use config::{ConfigError, SequencerConfig, DEFAULT_MAX_FRAGMENT_SIZE};
pub use listener::WriteErrorHandler;
pub use metrics::{SequencerMetrics, SequencerStats};
pub use sequencer::Sequencer;
pub use storage::{
    AppendListener, AppendRecord, BatchQueue, CompletionMode, InMemoryLogStorage, LogStorage,
    PendingAppend, StorageAppender, StorageError,
};
