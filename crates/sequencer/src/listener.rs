//! Storage callbacks for one sequenced batch

use crate::metrics::SequencerMetrics;
use crate::storage::{AppendListener, StorageError};
use parking_lot::Mutex;
use seqlog_core::Position;
use seqlog_flow::FlowControl;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Supervision hook notified when storage fails to write a batch
///
/// Never called while the sequencer's lock is held: a failure reported
/// during [`Sequencer::try_write`](crate::Sequencer::try_write) is delivered
/// just before `try_write` returns. The handler may call back into the
/// sequencer, e.g. to [`close`](crate::Sequencer::close) it.
pub trait WriteErrorHandler: Send + Sync {
    /// The batch `lowest_position..=highest_position` was lost
    fn on_write_failure(
        &self,
        lowest_position: Position,
        highest_position: Position,
        error: &StorageError,
    );
}

enum RelayState {
    /// The sequencer still holds its lock; park the failure
    Parked(Option<StorageError>),
    /// Deliver failures directly
    Direct,
}

/// Routes one batch's storage failure to the [`WriteErrorHandler`]
///
/// Starts out parking failures. [`release`](Self::release) is called by the
/// sequencer after dropping its lock and delivers a parked failure; any
/// later failure goes to the handler directly.
pub(crate) struct FailureRelay {
    handler: Arc<dyn WriteErrorHandler>,
    state: Mutex<RelayState>,
}

impl FailureRelay {
    pub(crate) fn new(handler: Arc<dyn WriteErrorHandler>) -> Self {
        Self {
            handler,
            state: Mutex::new(RelayState::Parked(None)),
        }
    }

    fn report(&self, lowest_position: Position, highest_position: Position, err: &StorageError) {
        {
            let mut state = self.state.lock();
            if let RelayState::Parked(parked) = &mut *state {
                *parked = Some(err.clone());
                return;
            }
        }
        self.handler
            .on_write_failure(lowest_position, highest_position, err);
    }

    /// Switch to direct delivery, handing over a parked failure
    pub(crate) fn release(&self, lowest_position: Position, highest_position: Position) {
        let parked = match std::mem::replace(&mut *self.state.lock(), RelayState::Direct) {
            RelayState::Parked(parked) => parked,
            RelayState::Direct => None,
        };
        if let Some(err) = parked {
            self.handler
                .on_write_failure(lowest_position, highest_position, &err);
        }
    }
}

/// Listener attached to every batch the sequencer appends
///
/// Feeds write and commit progress into the metrics, and releases flow
/// control permits up to the batch's highest position on commit or failure.
pub(crate) struct BatchAppendListener {
    partition_id: u32,
    lowest_position: Position,
    highest_position: Position,
    written: AtomicBool,
    flow_control: Arc<FlowControl>,
    metrics: Arc<SequencerMetrics>,
    relay: Option<Arc<FailureRelay>>,
}

impl BatchAppendListener {
    pub(crate) fn new(
        partition_id: u32,
        lowest_position: Position,
        highest_position: Position,
        flow_control: Arc<FlowControl>,
        metrics: Arc<SequencerMetrics>,
        relay: Option<Arc<FailureRelay>>,
    ) -> Self {
        Self {
            partition_id,
            lowest_position,
            highest_position,
            written: AtomicBool::new(false),
            flow_control,
            metrics,
            relay,
        }
    }
}

impl AppendListener for BatchAppendListener {
    fn on_write(&self, address: u64) {
        self.written.store(true, Ordering::Release);
        self.metrics.observe_written(self.highest_position);
        trace!(
            partition_id = self.partition_id,
            highest_position = self.highest_position,
            address,
            "Batch written"
        );
    }

    fn on_commit(&self, address: u64) {
        if !self.written.load(Ordering::Acquire) {
            warn!(
                partition_id = self.partition_id,
                lowest_position = self.lowest_position,
                highest_position = self.highest_position,
                address,
                "Batch committed before it was reported written"
            );
        }
        self.metrics.observe_committed(self.highest_position);
        self.flow_control.on_response(self.highest_position);
    }

    fn on_write_error(&self, err: &StorageError) {
        error!(
            partition_id = self.partition_id,
            lowest_position = self.lowest_position,
            highest_position = self.highest_position,
            error = %err,
            "Failed to write batch"
        );
        self.metrics.observe_write_error();
        self.flow_control.on_dropped(self.highest_position);
        if let Some(relay) = &self.relay {
            relay.report(self.lowest_position, self.highest_position, err);
        }
    }
}
