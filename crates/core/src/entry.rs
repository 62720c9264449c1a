//! Unsequenced log entries
//!
//! An [`Entry`] is what a producer hands to the sequencer. It has no
//! position yet; positions are assigned when the batch it belongs to is
//! accepted.

use crate::error::WriteFailure;
use crate::types::Intent;

/// Largest metadata section a frame can describe (u16 length field)
pub const MAX_METADATA_LENGTH: usize = u16::MAX as usize;

/// One producer-supplied record to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Record key
    pub key: i64,
    /// Record intent, used to tag the batch's limiter permit
    pub intent: Intent,
    /// Index of an earlier entry of the same batch that caused this one
    ///
    /// Resolved to a concrete position once the batch is sequenced.
    pub source_index: Option<usize>,
    /// Serialized record metadata, must not be empty
    pub metadata: Vec<u8>,
    /// Serialized record value, must not be empty
    pub value: Vec<u8>,
}

impl Entry {
    /// Create an entry without intent or same-batch source
    pub fn new(key: i64, metadata: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            intent: Intent::UNKNOWN,
            source_index: None,
            metadata: metadata.into(),
            value: value.into(),
        }
    }

    /// Set the record intent
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    /// Reference an earlier entry of the same batch as causal source
    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    /// Check that this entry, at `index` within its batch, can be framed
    ///
    /// Rejects empty metadata or value and metadata that does not fit the
    /// u16 length field. A source index is never rejected; one that does not
    /// point at an earlier entry resolves to the batch's external source.
    pub fn validate(&self, index: usize) -> Result<(), WriteFailure> {
        if self.metadata.is_empty() {
            return Err(WriteFailure::invalid(format!(
                "entry {} has empty metadata",
                index
            )));
        }
        if self.value.is_empty() {
            return Err(WriteFailure::invalid(format!(
                "entry {} has empty value",
                index
            )));
        }
        if self.metadata.len() > MAX_METADATA_LENGTH {
            return Err(WriteFailure::invalid(format!(
                "entry {} metadata is {} bytes, at most {} allowed",
                index,
                self.metadata.len(),
                MAX_METADATA_LENGTH
            )));
        }
        Ok(())
    }
}
