//! Frame decoding errors

use thiserror::Error;

/// Why a buffer could not be read as a run of frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The buffer ends inside a frame
    #[error("truncated frame at offset {offset}: need {needed} bytes, have {available}")]
    Truncated {
        /// Start of the frame
        offset: usize,
        /// Bytes the frame requires (padding included)
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// `frame_length` is smaller than the fixed header
    #[error("invalid frame length {length} at offset {offset}")]
    InvalidFrameLength {
        /// Start of the frame
        offset: usize,
        /// Decoded frame length
        length: usize,
    },

    /// `metadata_length` points past the end of the frame
    #[error("metadata length {metadata_length} exceeds frame length {frame_length} at offset {offset}")]
    InvalidMetadataLength {
        /// Start of the frame
        offset: usize,
        /// Decoded metadata length
        metadata_length: usize,
        /// Decoded frame length
        frame_length: usize,
    },

    /// The frame carries no metadata
    #[error("frame at offset {offset} has empty metadata")]
    EmptyMetadata {
        /// Start of the frame
        offset: usize,
    },

    /// The frame carries no value
    #[error("frame at offset {offset} has empty value")]
    EmptyValue {
        /// Start of the frame
        offset: usize,
    },
}

impl FrameError {
    /// Offset of the frame that failed to decode
    pub fn offset(&self) -> usize {
        match self {
            FrameError::Truncated { offset, .. }
            | FrameError::InvalidFrameLength { offset, .. }
            | FrameError::InvalidMetadataLength { offset, .. }
            | FrameError::EmptyMetadata { offset }
            | FrameError::EmptyValue { offset } => *offset,
        }
    }
}
