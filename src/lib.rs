//! # seqlog
//!
//! Write path of a replicated, ordered event log.
//!
//! seqlog assigns gap-free positions to batches written by concurrent
//! producers, throttles admission per command class with adaptive limits,
//! and frames entries into a byte-exact, 8-byte aligned log format.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use seqlog::prelude::*;
//!
//! let storage = Arc::new(InMemoryLogStorage::new());
//! let sequencer = Sequencer::new(&SequencerConfig::default(), storage.clone())?;
//!
//! let highest = sequencer.try_write(
//!     vec![Entry::new(1, "meta", "value")],
//!     NO_POSITION,
//!     CommandType::UserCommand,
//! )?;
//! assert_eq!(highest, 1);
//!
//! let data = storage.data();
//! let frames = read_frames(&data)?;
//! assert_eq!(frames[0].value, b"value");
//! # Ok::<(), seqlog::Error>(())
//! ```
//!
//! ## Crates
//!
//! - [`seqlog_core`] - entries, batches, command types, write failures
//! - [`flow`] - adaptive per-class admission control
//! - [`wire`] - frame serializer and reader
//! - [`seqlog_sequencer`] - sequencer, storage contract, hand-off

#![warn(missing_docs)]

mod error;
pub mod logging;
pub mod prelude;

pub use error::{Error, Result};

pub use seqlog_flow as flow;
pub use seqlog_wire as wire;

pub use seqlog_core::{
    CommandType, Entry, Intent, Position, SequencedBatch, WriteFailure, NO_POSITION,
};
pub use seqlog_flow::{FlowControl, FlowControlConfig, LimiterConfig};
pub use seqlog_sequencer::{
    AppendListener, BatchQueue, ConfigError, InMemoryLogStorage, LogStorage, Sequencer,
    SequencerConfig, SequencerStats, StorageAppender, StorageError, WriteErrorHandler,
};
pub use seqlog_wire::{read_frames, serialize_batch, FrameError, FrameReader, LoggedEntry};
