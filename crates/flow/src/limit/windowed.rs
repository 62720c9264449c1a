use super::{Limit, Sample};
use std::time::{Duration, Instant};

/// Accumulated samples of the current window
#[derive(Debug, Clone, Default)]
struct SampleWindow {
    rtt_sum: Duration,
    min_rtt: Option<Duration>,
    max_in_flight: usize,
    count: usize,
    did_drop: bool,
}

impl SampleWindow {
    fn add(&mut self, sample: Sample) {
        self.rtt_sum += sample.rtt;
        self.min_rtt = Some(self.min_rtt.map_or(sample.rtt, |m| m.min(sample.rtt)));
        self.max_in_flight = self.max_in_flight.max(sample.in_flight);
        self.count += 1;
        self.did_drop |= sample.did_drop;
    }

    fn average_rtt(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.rtt_sum / self.count as u32
        }
    }
}

/// Batches samples into windows before they reach the wrapped limit
///
/// Individual outliers do not move the limit: the delegate only sees one
/// aggregated sample (average latency, peak in-flight, any drop) per
/// window. A window closes once it holds `window_size` samples and its
/// duration has elapsed. The duration is twice the window's fastest
/// request, clamped to `[min_window_time, max_window_time]`.
#[derive(Debug)]
pub struct WindowedLimit<L> {
    delegate: L,
    min_window_time: Duration,
    max_window_time: Duration,
    window_size: usize,
    min_rtt_threshold: Duration,
    next_update: Option<Instant>,
    window: SampleWindow,
}

impl<L: Limit> WindowedLimit<L> {
    /// Wrap `delegate`
    ///
    /// Samples faster than `min_rtt_threshold` are ignored, unless they
    /// carry a drop.
    pub fn new(
        delegate: L,
        min_window_time: Duration,
        max_window_time: Duration,
        window_size: usize,
        min_rtt_threshold: Duration,
    ) -> Self {
        Self {
            delegate,
            min_window_time,
            max_window_time: max_window_time.max(min_window_time),
            window_size: window_size.max(1),
            min_rtt_threshold,
            next_update: None,
            window: SampleWindow::default(),
        }
    }

    /// The wrapped limit
    pub fn delegate(&self) -> &L {
        &self.delegate
    }

    /// Samples collected in the open window
    pub fn pending_samples(&self) -> usize {
        self.window.count
    }
}

impl<L: Limit> Limit for WindowedLimit<L> {
    fn limit(&self) -> usize {
        self.delegate.limit()
    }

    fn on_sample(&mut self, now: Instant, sample: Sample) {
        if sample.rtt < self.min_rtt_threshold && !sample.did_drop {
            return;
        }
        self.window.add(sample);

        let window_elapsed = self.next_update.map_or(true, |at| now >= at);
        if !window_elapsed || self.window.count < self.window_size {
            return;
        }

        let closed = std::mem::take(&mut self.window);
        let min_rtt = closed.min_rtt.unwrap_or_default();
        let window_time = (min_rtt * 2).clamp(self.min_window_time, self.max_window_time);
        self.next_update = Some(now + window_time);

        self.delegate.on_sample(
            now,
            Sample {
                rtt: closed.average_rtt(),
                in_flight: closed.max_in_flight,
                did_drop: closed.did_drop,
            },
        );
    }
}
