//! Flow control for seqlog
//!
//! This crate implements adaptive admission control per command class:
//! - [`Limit`]: algorithm turning completed-request samples into a limit
//!   ([`AimdLimit`], [`FixedLimit`], [`WindowedLimit`])
//! - [`Limiter`]: pending-permit tracking with cumulative acknowledgment
//! - [`FlowControl`]: routes calls to the limiter of a command class;
//!   follow-up events are never limited
//!
//! ## Admission Cycle
//!
//! ```text
//! try_acquire(id) ── limit reached? ── yes ──> denied (FULL)
//!        │
//!        no: permit pending under `id`
//!        │
//! on_response(P) ── releases permits <= P ──> samples ──> window ──> AIMD
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod flow_control;
pub mod limit;
pub mod limiter;

pub use config::{AimdConfig, FlowControlConfig, InvalidLimiterConfig, LimiterConfig, WindowConfig};
pub use flow_control::{AdmissionPolicy, FlowControl};
pub use limit::{AimdLimit, FixedLimit, Limit, Sample, WindowedLimit};
pub use limiter::{Limiter, LimiterStats};
