//! Write rejection reasons
//!
//! A rejected write never consumes a position. Rejections are returned,
//! never panicked, and are local conditions the caller decides how to
//! handle (retry, buffer, or push back on its own client).

use crate::types::CommandType;
use thiserror::Error;

/// Why a write was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteFailure {
    /// The sequencer was closed
    #[error("sequencer is closed")]
    Closed,

    /// The batch or one of its entries cannot be written
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the batch
        reason: String,
    },

    /// The limiter of this command class denied admission
    #[error("log is full for {command_type}")]
    Full {
        /// Class whose limiter rejected the write
        command_type: CommandType,
    },
}

impl WriteFailure {
    /// Shorthand for [`WriteFailure::InvalidArgument`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        WriteFailure::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same write later may succeed
    ///
    /// Only backpressure is transient; a closed sequencer stays closed and
    /// an invalid batch stays invalid.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WriteFailure::Full { .. })
    }

    /// Stable kind name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            WriteFailure::Closed => "CLOSED",
            WriteFailure::InvalidArgument { .. } => "INVALID_ARGUMENT",
            WriteFailure::Full { .. } => "FULL",
        }
    }
}
