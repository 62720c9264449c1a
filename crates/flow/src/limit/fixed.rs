use super::{Limit, Sample};
use std::time::Instant;

/// A limit that never changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLimit(usize);

impl FixedLimit {
    /// Create a fixed limit
    pub fn new(limit: usize) -> Self {
        FixedLimit(limit)
    }
}

impl Limit for FixedLimit {
    fn limit(&self) -> usize {
        self.0
    }

    fn on_sample(&mut self, _now: Instant, _sample: Sample) {}
}
