//! Frame layout
//!
//! Every entry is written as one frame. All integers are little-endian.
//!
//! ```text
//! offset  size  field
//! ------  ----  -----------------------------------------------
//!      0     4  frame_length (u32): header + metadata + value
//!      4     8  position (i64)
//!     12     8  source_position (i64)
//!     20     8  key (i64)
//!     28     8  timestamp (i64, millis)
//!     36     2  metadata_length (u16)
//!     38     m  metadata
//!   38+m     v  value
//!      -     p  zero padding up to FRAME_ALIGNMENT
//! ```
//!
//! The next frame starts at `align(frame_length)`. Replicas, exporters and
//! readers depend on this layout; it must not change.

use seqlog_core::SequencedBatch;

/// Frames start at multiples of this many bytes
pub const FRAME_ALIGNMENT: usize = 8;

/// Length of the frame header (the `frame_length` field)
pub const FRAME_HEADER_LENGTH: usize = 4;

/// Length of the fixed entry header following the frame header
pub const ENTRY_HEADER_LENGTH: usize = 34;

/// Length of all fixed fields of a frame
pub const HEADER_LENGTH: usize = FRAME_HEADER_LENGTH + ENTRY_HEADER_LENGTH;

/// Offset of `frame_length`
pub const FRAME_LENGTH_OFFSET: usize = 0;
/// Offset of `position`
pub const POSITION_OFFSET: usize = 4;
/// Offset of `source_position`
pub const SOURCE_POSITION_OFFSET: usize = 12;
/// Offset of `key`
pub const KEY_OFFSET: usize = 20;
/// Offset of `timestamp`
pub const TIMESTAMP_OFFSET: usize = 28;
/// Offset of `metadata_length`
pub const METADATA_LENGTH_OFFSET: usize = 36;
/// Offset of the metadata bytes
pub const METADATA_OFFSET: usize = 38;

/// Round `length` up to the next multiple of [`FRAME_ALIGNMENT`]
#[inline]
pub const fn align(length: usize) -> usize {
    (length + FRAME_ALIGNMENT - 1) & !(FRAME_ALIGNMENT - 1)
}

/// Length of the entry header including its metadata
#[inline]
pub const fn header_length(metadata_length: usize) -> usize {
    ENTRY_HEADER_LENGTH + metadata_length
}

/// Value of the `frame_length` field for an entry (no padding)
#[inline]
pub const fn frame_length(metadata_length: usize, value_length: usize) -> usize {
    header_length(metadata_length) + value_length + FRAME_HEADER_LENGTH
}

/// Bytes one entry occupies in the log, padding included
#[inline]
pub const fn framed_entry_length(metadata_length: usize, value_length: usize) -> usize {
    align(frame_length(metadata_length, value_length))
}

/// Exact number of bytes [`serialize_batch`](crate::serialize_batch) produces
pub fn framed_batch_length(batch: &SequencedBatch) -> usize {
    batch
        .entries()
        .iter()
        .map(|e| framed_entry_length(e.metadata.len(), e.value.len()))
        .sum()
}

/// Upper bound of the framed size of `event_count` entries carrying
/// `batch_size` bytes of metadata and value in total
///
/// Each entry is charged a full header plus a full alignment unit, which
/// is never less than its actual padding.
#[inline]
pub fn max_framed_length(event_count: usize, batch_size: usize) -> usize {
    event_count
        .saturating_mul(HEADER_LENGTH + FRAME_ALIGNMENT)
        .saturating_add(batch_size)
}

/// Whether `event_count` entries of `batch_size` total bytes fit a fragment
/// of `max_fragment_size` bytes
#[inline]
pub fn can_write_events(event_count: usize, batch_size: usize, max_fragment_size: usize) -> bool {
    max_framed_length(event_count, batch_size) <= max_fragment_size
}
