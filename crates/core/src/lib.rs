//! Core types for seqlog
//!
//! This crate defines the types shared by every layer of the write path:
//! - [`Entry`]: Unsequenced producer record
//! - [`SequencedBatch`]: Entries with their assigned position range
//! - [`CommandType`] / [`Intent`]: Admission class and record intent
//! - [`WriteFailure`]: Why a write was rejected

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod entry;
pub mod error;
pub mod types;

pub use batch::SequencedBatch;
pub use entry::{Entry, MAX_METADATA_LENGTH};
pub use error::WriteFailure;
pub use types::{CommandType, Intent, Position, NO_POSITION};
