//! Per-class admission limiter
//!
//! A [`Limiter`] tracks the batches of one command class that were admitted
//! but not yet acknowledged. Admission succeeds while fewer than
//! `limit` permits are pending. Acknowledgment is cumulative: releasing id
//! `P` releases every pending permit with an id `<= P`, and each released
//! permit feeds one sample into the limit algorithm.
//!
//! # Thread Safety
//!
//! Acquire runs on the writer's thread (inside the sequencer's critical
//! section); release runs on storage completion threads. Both go through
//! one internal mutex, and releasing an id that is already released is a
//! no-op.

use crate::limit::{Limit, Sample};
use parking_lot::Mutex;
use seqlog_core::{CommandType, Intent, Position};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// An admitted, not yet acknowledged batch
#[derive(Debug, Clone, Copy)]
struct Permit {
    intent: Intent,
    acquired_at: Instant,
    in_flight: usize,
}

#[derive(Debug)]
struct LimiterState {
    limit: Box<dyn Limit>,
    pending: BTreeMap<Position, Permit>,
}

/// Point-in-time view of a limiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    /// Class this limiter guards
    pub command_type: CommandType,
    /// Current limit
    pub limit: usize,
    /// Permits currently pending
    pub in_flight: usize,
    /// Acquires that succeeded
    pub accepted: u64,
    /// Acquires that were denied
    pub rejected: u64,
    /// Permits released with an overload signal
    pub dropped: u64,
}

/// Adaptive admission control for one command class
#[derive(Debug)]
pub struct Limiter {
    command_type: CommandType,
    state: Mutex<LimiterState>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

impl Limiter {
    /// Create a limiter for `command_type` driven by `limit`
    pub fn new(command_type: CommandType, limit: Box<dyn Limit>) -> Self {
        Self {
            command_type,
            state: Mutex::new(LimiterState {
                limit,
                pending: BTreeMap::new(),
            }),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Class this limiter guards
    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Current limit
    pub fn limit(&self) -> usize {
        self.state.lock().limit.limit()
    }

    /// Number of pending permits
    pub fn in_flight(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Ids and intents of the pending permits, lowest id first
    pub fn pending(&self) -> Vec<(Position, Intent)> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|(id, permit)| (*id, permit.intent))
            .collect()
    }

    /// Try to admit the batch identified by `id`
    ///
    /// Returns `true` and records a pending permit iff fewer than `limit`
    /// permits are pending.
    pub fn try_acquire(&self, id: Position, intent: Intent) -> bool {
        self.try_acquire_at(id, intent, Instant::now())
    }

    /// [`try_acquire`](Self::try_acquire) with an explicit clock reading
    pub fn try_acquire_at(&self, id: Position, intent: Intent, now: Instant) -> bool {
        let mut state = self.state.lock();
        let limit = state.limit.limit();
        let in_flight = state.pending.len();

        if in_flight >= limit {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                command_type = %self.command_type,
                id,
                %intent,
                limit,
                in_flight,
                "Admission denied"
            );
            return false;
        }

        state.pending.insert(
            id,
            Permit {
                intent,
                acquired_at: now,
                in_flight: in_flight + 1,
            },
        );
        self.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Acknowledge every permit with an id `<= id`
    ///
    /// Returns the number of permits released.
    pub fn on_response(&self, id: Position) -> usize {
        self.release(id, Instant::now(), false)
    }

    /// [`on_response`](Self::on_response) with an explicit clock reading
    pub fn on_response_at(&self, id: Position, now: Instant) -> usize {
        self.release(id, now, false)
    }

    /// Release every permit with an id `<= id` as failed
    ///
    /// The failure counts as an overload signal for the limit.
    pub fn on_dropped(&self, id: Position) -> usize {
        self.release(id, Instant::now(), true)
    }

    /// Snapshot of counters and current limit
    pub fn stats(&self) -> LimiterStats {
        let state = self.state.lock();
        LimiterStats {
            command_type: self.command_type,
            limit: state.limit.limit(),
            in_flight: state.pending.len(),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn release(&self, id: Position, now: Instant, did_drop: bool) -> usize {
        let mut state = self.state.lock();
        match state.pending.keys().next() {
            Some(lowest) if *lowest <= id => {}
            _ => return 0,
        }

        let released = match id.checked_add(1) {
            Some(bound) => {
                let still_pending = state.pending.split_off(&bound);
                std::mem::replace(&mut state.pending, still_pending)
            }
            None => std::mem::take(&mut state.pending),
        };

        let before = state.limit.limit();
        for (released_id, permit) in &released {
            state.limit.on_sample(
                now,
                Sample {
                    rtt: now.saturating_duration_since(permit.acquired_at),
                    in_flight: permit.in_flight,
                    did_drop,
                },
            );
            trace!(
                command_type = %self.command_type,
                id = released_id,
                intent = %permit.intent,
                did_drop,
                "Released permit"
            );
        }
        let after = state.limit.limit();
        if before != after {
            debug!(
                command_type = %self.command_type,
                old_limit = before,
                new_limit = after,
                "Limit changed"
            );
        }

        if did_drop {
            self.dropped
                .fetch_add(released.len() as u64, Ordering::Relaxed);
        }
        released.len()
    }
}
