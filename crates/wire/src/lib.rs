//! Frame encoding for seqlog
//!
//! This crate implements the durable/wire representation of sequenced
//! batches. Each entry becomes one length-prefixed, 8-byte aligned frame:
//!
//! | Field | Type |
//! |-------|------|
//! | frame_length | u32 |
//! | position | i64 |
//! | source_position | i64 |
//! | key | i64 |
//! | timestamp | i64 |
//! | metadata_length | u16 |
//! | metadata | bytes |
//! | value | bytes |
//! | padding | to 8 bytes |
//!
//! ## Examples
//!
//! ```
//! use seqlog_core::{Entry, SequencedBatch};
//! use seqlog_wire::{read_frames, serialize_batch};
//!
//! let batch = SequencedBatch::new(0, 1, -1, vec![Entry::new(7, "meta", "value")]);
//! let bytes = serialize_batch(&batch);
//!
//! let entries = read_frames(&bytes).unwrap();
//! assert_eq!(entries[0].position, 1);
//! assert_eq!(entries[0].value, b"value");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod frame;
pub mod reader;
pub mod serializer;

pub use error::FrameError;
pub use frame::{
    align, can_write_events, framed_batch_length, framed_entry_length, max_framed_length,
    FRAME_ALIGNMENT, HEADER_LENGTH,
};
pub use reader::{read_frame, read_frames, FrameReader, LoggedEntry};
pub use serializer::{serialize_batch, serialize_batch_into};
