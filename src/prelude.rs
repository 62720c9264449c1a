//! Convenient imports for seqlog.
//!
//! ```
//! use seqlog::prelude::*;
//!
//! let config = SequencerConfig::default();
//! assert_eq!(config.initial_position, 1);
//! ```

// Error handling
pub use crate::error::{Error, Result};

// Write path
pub use seqlog_sequencer::{InMemoryLogStorage, LogStorage, Sequencer, SequencerConfig};

// Core types
pub use seqlog_core::{CommandType, Entry, Intent, Position, WriteFailure, NO_POSITION};

// Flow control
pub use seqlog_flow::{FlowControlConfig, LimiterConfig};

// Frames
pub use seqlog_wire::{read_frames, serialize_batch, FrameReader};
