//! Core types for the log write path
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Position`]: Slot of an entry in the log
//! - [`CommandType`]: Admission class of a write
//! - [`Intent`]: Record intent carried for flow-control bookkeeping

use serde::{Deserialize, Serialize};

/// Position of an entry in the log
///
/// Positions are assigned by the sequencer, strictly increasing and
/// contiguous across accepted writes.
pub type Position = i64;

/// Sentinel for "no position", e.g. an entry without a causal source
pub const NO_POSITION: Position = -1;

/// Admission class of a write
///
/// Selects which limiter (if any) guards the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Command sent by a client
    UserCommand,
    /// Command generated by the engine itself (timers, message expiry)
    InternalCommand,
    /// Command sent by another partition
    InterPartitionCommand,
    /// Events produced while processing an already admitted command
    ///
    /// Never consults a limiter.
    FollowUpEvents,
}

impl CommandType {
    /// All command types, in declaration order
    pub const ALL: [CommandType; 4] = [
        CommandType::UserCommand,
        CommandType::InternalCommand,
        CommandType::InterPartitionCommand,
        CommandType::FollowUpEvents,
    ];

    /// Stable name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::UserCommand => "USER_COMMAND",
            CommandType::InternalCommand => "INTERNAL_COMMAND",
            CommandType::InterPartitionCommand => "INTER_PARTITION_COMMAND",
            CommandType::FollowUpEvents => "FOLLOW_UP_EVENTS",
        }
    }

    /// Whether writes of this type bypass admission control entirely
    pub fn is_follow_up(&self) -> bool {
        matches!(self, CommandType::FollowUpEvents)
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent of a record (e.g. "create", "complete")
///
/// The log does not interpret intents. The first entry's intent tags the
/// limiter permit of a batch so in-flight work can be attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Intent(pub u16);

impl Intent {
    /// Intent of entries that carry none
    pub const UNKNOWN: Intent = Intent(u16::MAX);

    /// Raw intent value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Intent::UNKNOWN {
            f.write_str("UNKNOWN")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
