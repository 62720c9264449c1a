//! Limit algorithms
//!
//! A [`Limit`] turns a stream of completed-request samples into a
//! concurrency limit. The [`Limiter`](crate::Limiter) owns one and consults
//! it on every acquire.
//!
//! - [`AimdLimit`]: additive increase, multiplicative decrease
//! - [`FixedLimit`]: constant limit, ignores samples
//! - [`WindowedLimit`]: aggregates samples into windows before handing
//!   them to another limit

mod aimd;
mod fixed;
mod windowed;

pub use aimd::AimdLimit;
pub use fixed::FixedLimit;
pub use windowed::WindowedLimit;

use std::fmt;
use std::time::{Duration, Instant};

/// Observation of one completed (or dropped) request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Time from acquire to release
    pub rtt: Duration,
    /// Requests in flight when this one was admitted (itself included)
    pub in_flight: usize,
    /// Whether the request failed with an overload signal
    pub did_drop: bool,
}

/// An algorithm computing a concurrency limit from samples
pub trait Limit: Send + fmt::Debug {
    /// Current limit
    fn limit(&self) -> usize;

    /// Feed one observation taken at `now`
    fn on_sample(&mut self, now: Instant, sample: Sample);
}
