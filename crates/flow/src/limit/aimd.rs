use super::{Limit, Sample};
use std::time::{Duration, Instant};

/// Additive-increase / multiplicative-decrease limit
///
/// - A drop, or a request slower than `timeout`, multiplies the limit by
///   `backoff_ratio` (never below `min_limit`).
/// - A successful request grows the limit by one, but only while at least
///   half of the limit is in use (never above `max_limit`). An idle limiter
///   does not grow without bound.
#[derive(Debug, Clone)]
pub struct AimdLimit {
    limit: usize,
    min_limit: usize,
    max_limit: usize,
    backoff_ratio: f64,
    timeout: Duration,
}

impl AimdLimit {
    /// Create a limit starting at `initial_limit`, clamped to the bounds
    pub fn new(
        initial_limit: usize,
        min_limit: usize,
        max_limit: usize,
        backoff_ratio: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            limit: initial_limit.clamp(min_limit, max_limit),
            min_limit,
            max_limit,
            backoff_ratio,
            timeout,
        }
    }

    /// Latency above which a sample counts as overload
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Limit for AimdLimit {
    fn limit(&self) -> usize {
        self.limit
    }

    fn on_sample(&mut self, _now: Instant, sample: Sample) {
        if sample.did_drop || sample.rtt > self.timeout {
            let decreased = (self.limit as f64 * self.backoff_ratio).floor() as usize;
            self.limit = decreased.max(self.min_limit);
        } else if sample.in_flight * 2 >= self.limit {
            self.limit = (self.limit + 1).min(self.max_limit);
        }
    }
}
