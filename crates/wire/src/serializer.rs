//! Batch serialization
//!
//! Writes a [`SequencedBatch`] as a run of aligned frames (see
//! [`frame`](crate::frame) for the layout). The output buffer is sized
//! exactly once up front; nothing is resized while writing.

use crate::frame::{
    frame_length, framed_batch_length, align, FRAME_LENGTH_OFFSET, KEY_OFFSET,
    METADATA_LENGTH_OFFSET, METADATA_OFFSET, POSITION_OFFSET, SOURCE_POSITION_OFFSET,
    TIMESTAMP_OFFSET,
};
use byteorder::{ByteOrder, LittleEndian};
use seqlog_core::{SequencedBatch, MAX_METADATA_LENGTH};

/// Serialize a batch into a newly allocated buffer
///
/// # Panics
///
/// Panics if an entry has empty metadata, an empty value, or metadata
/// longer than `u16::MAX`. The sequencer rejects such entries before they
/// are positioned, so reaching this is a bug in the caller.
pub fn serialize_batch(batch: &SequencedBatch) -> Vec<u8> {
    let mut buffer = vec![0u8; framed_batch_length(batch)];
    let written = serialize_batch_into(batch, &mut buffer);
    debug_assert_eq!(written, buffer.len());
    buffer
}

/// Serialize a batch into `buffer`, returning the number of bytes written
///
/// Padding bytes are zeroed, so `buffer` may be reused.
///
/// # Panics
///
/// Panics if `buffer` is shorter than [`framed_batch_length`], and on the
/// entry invariant violations listed for [`serialize_batch`].
pub fn serialize_batch_into(batch: &SequencedBatch, buffer: &mut [u8]) -> usize {
    let required = framed_batch_length(batch);
    assert!(
        buffer.len() >= required,
        "buffer of {} bytes cannot hold batch of {} bytes",
        buffer.len(),
        required
    );

    let mut offset = 0;
    for (index, (position, entry)) in batch.iter().enumerate() {
        let metadata_length = entry.metadata.len();
        let value_length = entry.value.len();
        assert!(
            metadata_length > 0,
            "entry at position {} has empty metadata",
            position
        );
        assert!(
            value_length > 0,
            "entry at position {} has empty value",
            position
        );
        assert!(
            metadata_length <= MAX_METADATA_LENGTH,
            "entry at position {} has {} bytes of metadata",
            position,
            metadata_length
        );

        let length = frame_length(metadata_length, value_length);
        assert!(
            length <= u32::MAX as usize,
            "entry at position {} does not fit a frame",
            position
        );
        let aligned = align(length);
        let frame = &mut buffer[offset..offset + aligned];

        LittleEndian::write_u32(&mut frame[FRAME_LENGTH_OFFSET..], length as u32);
        LittleEndian::write_i64(&mut frame[POSITION_OFFSET..], position);
        LittleEndian::write_i64(
            &mut frame[SOURCE_POSITION_OFFSET..],
            batch.source_position_of(index),
        );
        LittleEndian::write_i64(&mut frame[KEY_OFFSET..], entry.key);
        LittleEndian::write_i64(&mut frame[TIMESTAMP_OFFSET..], batch.timestamp());
        LittleEndian::write_u16(
            &mut frame[METADATA_LENGTH_OFFSET..],
            metadata_length as u16,
        );

        let value_offset = METADATA_OFFSET + metadata_length;
        frame[METADATA_OFFSET..value_offset].copy_from_slice(&entry.metadata);
        frame[value_offset..length].copy_from_slice(&entry.value);
        frame[length..].fill(0);

        offset += aligned;
    }
    offset
}
