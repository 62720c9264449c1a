//! Frame reader
//!
//! Zero-copy parsing of serialized batches. Entries borrow their metadata
//! and value from the underlying buffer.

use crate::error::FrameError;
use crate::frame::{
    align, FRAME_LENGTH_OFFSET, HEADER_LENGTH, KEY_OFFSET, METADATA_LENGTH_OFFSET,
    METADATA_OFFSET, POSITION_OFFSET, SOURCE_POSITION_OFFSET, TIMESTAMP_OFFSET,
};
use byteorder::{ByteOrder, LittleEndian};
use seqlog_core::Position;

/// One entry as it was written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedEntry<'a> {
    /// Position of the entry
    pub position: Position,
    /// Resolved source position
    pub source_position: Position,
    /// Record key
    pub key: i64,
    /// Batch timestamp (millis)
    pub timestamp: i64,
    /// Metadata bytes
    pub metadata: &'a [u8],
    /// Value bytes
    pub value: &'a [u8],
}

impl LoggedEntry<'_> {
    /// Bytes this entry occupies in the log, padding included
    pub fn framed_length(&self) -> usize {
        align(HEADER_LENGTH + self.metadata.len() + self.value.len())
    }
}

/// Decode the frame starting at `offset`
///
/// Returns the entry and the offset of the next frame.
pub fn read_frame(buffer: &[u8], offset: usize) -> Result<(LoggedEntry<'_>, usize), FrameError> {
    let available = buffer.len().saturating_sub(offset);
    if available < HEADER_LENGTH {
        return Err(FrameError::Truncated {
            offset,
            needed: HEADER_LENGTH,
            available,
        });
    }

    let frame = &buffer[offset..];
    let length = LittleEndian::read_u32(&frame[FRAME_LENGTH_OFFSET..]) as usize;
    if length < HEADER_LENGTH {
        return Err(FrameError::InvalidFrameLength { offset, length });
    }

    let aligned = align(length);
    if aligned > available {
        return Err(FrameError::Truncated {
            offset,
            needed: aligned,
            available,
        });
    }

    let metadata_length = LittleEndian::read_u16(&frame[METADATA_LENGTH_OFFSET..]) as usize;
    if metadata_length == 0 {
        return Err(FrameError::EmptyMetadata { offset });
    }
    let value_offset = METADATA_OFFSET + metadata_length;
    if value_offset > length {
        return Err(FrameError::InvalidMetadataLength {
            offset,
            metadata_length,
            frame_length: length,
        });
    }
    if value_offset == length {
        return Err(FrameError::EmptyValue { offset });
    }

    let entry = LoggedEntry {
        position: LittleEndian::read_i64(&frame[POSITION_OFFSET..]),
        source_position: LittleEndian::read_i64(&frame[SOURCE_POSITION_OFFSET..]),
        key: LittleEndian::read_i64(&frame[KEY_OFFSET..]),
        timestamp: LittleEndian::read_i64(&frame[TIMESTAMP_OFFSET..]),
        metadata: &frame[METADATA_OFFSET..value_offset],
        value: &frame[value_offset..length],
    };
    Ok((entry, offset + aligned))
}

/// Iterator over the frames of a buffer
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> FrameReader<'a> {
    /// Read frames from the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::at(buffer, 0)
    }

    /// Read frames starting at `offset`, which must be a frame boundary
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self {
            buffer,
            offset,
            failed: false,
        }
    }

    /// Offset of the next frame to read
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<LoggedEntry<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }
        match read_frame(self.buffer, self.offset) {
            Ok((entry, next)) => {
                self.offset = next;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode every frame of `buffer`
pub fn read_frames(buffer: &[u8]) -> Result<Vec<LoggedEntry<'_>>, FrameError> {
    FrameReader::new(buffer).collect()
}
