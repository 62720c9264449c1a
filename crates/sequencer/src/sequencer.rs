//! Position assignment for the log write path
//!
//! The [`Sequencer`] validates producer batches, assigns each accepted batch
//! a contiguous position range, asks flow control for admission and hands
//! the batch to storage.
//!
//! ## Write Sequence
//!
//! ```text
//! 1. closed?                      -> CLOSED
//! 2. validate entries and size    -> INVALID_ARGUMENT
//! 3. lock
//! 4. lowest = counter, highest = lowest + len - 1
//! 5. admit(highest) unless follow-up -> FULL (counter untouched)
//! 6. storage.append(lowest, highest, batch, listener)
//! 7. counter = highest + 1
//! 8. unlock
//! 9. report a failure storage raised in step 6, return highest
//! ```
//!
//! A rejected write never consumes a position, so accepted ranges are
//! gap-free.
//!
//! # Thread Safety
//!
//! Steps 3 to 8 run under a single lock, which totally orders position
//! assignment, the admission decision and the `append` call. Storage
//! therefore sees ranges in increasing, non-overlapping order. Storage
//! listeners may run inside step 6 and take limiter locks; the lock order
//! is always sequencer then limiter. The [`WriteErrorHandler`] only runs
//! once the lock is released, so it may call back into the sequencer.

use crate::config::{ConfigError, SequencerConfig};
use crate::listener::{BatchAppendListener, FailureRelay, WriteErrorHandler};
use crate::metrics::SequencerMetrics;
use crate::storage::LogStorage;
use parking_lot::Mutex;
use seqlog_core::{CommandType, Entry, Position, SequencedBatch, WriteFailure};
use seqlog_flow::FlowControl;
use seqlog_wire::framed_entry_length;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

struct SequencerState {
    /// Position the next accepted entry receives
    next_position: Position,
}

/// Assigns gap-free positions to batches and submits them to storage
pub struct Sequencer {
    partition_id: u32,
    max_fragment_size: usize,

    /// Position counter
    ///
    /// Only advanced under this lock, after admission succeeded.
    state: Mutex<SequencerState>,

    /// Set under `state`; read without it on the fast path
    closed: AtomicBool,

    storage: Arc<dyn LogStorage>,
    flow_control: Arc<FlowControl>,
    metrics: Arc<SequencerMetrics>,
    error_handler: Option<Arc<dyn WriteErrorHandler>>,
}

impl Sequencer {
    /// Create a sequencer writing to `storage`
    ///
    /// Flow control is built from `config.flow_control`.
    pub fn new(config: &SequencerConfig, storage: Arc<dyn LogStorage>) -> Result<Self, ConfigError> {
        config.validate()?;
        let flow_control = Arc::new(FlowControl::new(&config.flow_control));
        Ok(Self::with_flow_control(config, storage, flow_control))
    }

    /// Create a sequencer sharing an existing [`FlowControl`]
    ///
    /// `config.flow_control` is ignored; `config` is assumed valid.
    pub fn with_flow_control(
        config: &SequencerConfig,
        storage: Arc<dyn LogStorage>,
        flow_control: Arc<FlowControl>,
    ) -> Self {
        info!(
            partition_id = config.partition_id,
            initial_position = config.initial_position,
            max_fragment_size = config.max_fragment_size,
            "Sequencer opened"
        );
        Self {
            partition_id: config.partition_id,
            max_fragment_size: config.max_fragment_size,
            state: Mutex::new(SequencerState {
                next_position: config.initial_position,
            }),
            closed: AtomicBool::new(false),
            storage,
            flow_control,
            metrics: Arc::new(SequencerMetrics::new()),
            error_handler: None,
        }
    }

    /// Notify `handler` whenever storage fails a batch
    pub fn with_error_handler(mut self, handler: Arc<dyn WriteErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Whether `event_count` entries totalling `batch_size` payload bytes
    /// fit in one fragment once framed
    pub fn can_write_events(&self, event_count: usize, batch_size: usize) -> bool {
        seqlog_wire::can_write_events(event_count, batch_size, self.max_fragment_size)
    }

    /// Append `entries` as one batch
    ///
    /// Returns the highest position assigned to the batch. `source_position`
    /// is the position of the record that caused this batch, or `-1`.
    ///
    /// # Errors
    ///
    /// - [`WriteFailure::Closed`] after [`close`](Self::close)
    /// - [`WriteFailure::InvalidArgument`] for an empty batch, an invalid
    ///   entry, or a batch larger than the maximum fragment size
    /// - [`WriteFailure::Full`] when flow control denies admission
    pub fn try_write(
        &self,
        entries: Vec<Entry>,
        source_position: Position,
        command_type: CommandType,
    ) -> Result<Position, WriteFailure> {
        let result = self.write(entries, source_position, command_type);
        if let Err(failure) = &result {
            self.metrics.observe_rejection(failure);
        }
        result
    }

    fn write(
        &self,
        entries: Vec<Entry>,
        source_position: Position,
        command_type: CommandType,
    ) -> Result<Position, WriteFailure> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WriteFailure::Closed);
        }
        let framed_length = self.validate(&entries)?;
        let entry_count = entries.len();
        let intent = entries[0].intent;

        let (lowest_position, highest_position, relay) = {
            let mut state = self.state.lock();
            let lowest_position = state.next_position;
            let highest_position = lowest_position
                .checked_add(entry_count as Position - 1)
                .filter(|highest| *highest < Position::MAX)
                .ok_or_else(|| {
                    WriteFailure::invalid(format!(
                        "{} entries at position {} exceed the position space",
                        entry_count, lowest_position
                    ))
                })?;

            if !command_type.is_follow_up()
                && !self
                    .flow_control
                    .try_acquire(command_type, highest_position, intent)
            {
                debug!(
                    partition_id = self.partition_id,
                    %command_type,
                    %intent,
                    highest_position,
                    "Write rejected by flow control"
                );
                return Err(WriteFailure::Full { command_type });
            }

            let timestamp = chrono::Utc::now().timestamp_millis();
            let batch = SequencedBatch::new(timestamp, lowest_position, source_position, entries);
            let relay = self
                .error_handler
                .as_ref()
                .map(|handler| Arc::new(FailureRelay::new(Arc::clone(handler))));
            let listener = BatchAppendListener::new(
                self.partition_id,
                lowest_position,
                highest_position,
                Arc::clone(&self.flow_control),
                Arc::clone(&self.metrics),
                relay.clone(),
            );
            self.storage
                .append(lowest_position, highest_position, batch, Box::new(listener));

            state.next_position = highest_position + 1;
            (lowest_position, highest_position, relay)
        };

        if let Some(relay) = relay {
            relay.release(lowest_position, highest_position);
        }

        self.metrics.observe_batch(entry_count, framed_length);
        trace!(
            partition_id = self.partition_id,
            %command_type,
            entries = entry_count,
            bytes = framed_length,
            highest_position,
            "Write accepted"
        );
        Ok(highest_position)
    }

    /// Check entries and return the framed length of the batch
    fn validate(&self, entries: &[Entry]) -> Result<usize, WriteFailure> {
        if entries.is_empty() {
            return Err(WriteFailure::invalid("batch has no entries"));
        }
        let mut framed_length = 0usize;
        for (index, entry) in entries.iter().enumerate() {
            entry.validate(index)?;
            framed_length = framed_length
                .saturating_add(framed_entry_length(entry.metadata.len(), entry.value.len()));
        }
        if framed_length > self.max_fragment_size {
            return Err(WriteFailure::invalid(format!(
                "batch of {} bytes exceeds max fragment size {}",
                framed_length, self.max_fragment_size
            )));
        }
        Ok(framed_length)
    }

    /// Acknowledge every admitted batch up to and including `position`
    ///
    /// Cumulative and idempotent; safe to call from any thread.
    pub fn acknowledge_position(&self, position: Position) {
        self.flow_control.on_response(position);
    }

    /// Stop accepting writes
    ///
    /// One-way. Batches already handed to storage are unaffected.
    pub fn close(&self) {
        let state = self.state.lock();
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(
                partition_id = self.partition_id,
                next_position = state.next_position,
                "Sequencer closed"
            );
        }
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Position the next accepted entry will receive
    pub fn next_position(&self) -> Position {
        self.state.lock().next_position
    }

    /// Partition this sequencer writes for
    pub fn partition_id(&self) -> u32 {
        self.partition_id
    }

    /// Largest framed batch size accepted
    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    /// Flow control consulted on every non-follow-up write
    pub fn flow_control(&self) -> &Arc<FlowControl> {
        &self.flow_control
    }

    /// Write path metrics
    pub fn metrics(&self) -> &Arc<SequencerMetrics> {
        &self.metrics
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("partition_id", &self.partition_id)
            .field("max_fragment_size", &self.max_fragment_size)
            .field("next_position", &self.next_position())
            .field("closed", &self.is_closed())
            .finish()
    }
}
