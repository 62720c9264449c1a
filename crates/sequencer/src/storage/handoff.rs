//! Pull-based hand-off between the sequencer and a storage appender
//!
//! [`BatchQueue`] is a [`LogStorage`] that only enqueues. A single
//! [`StorageAppender`] thread drains it in order and forwards each batch to
//! the real storage, so writers never block on storage I/O.
//!
//! Forwarding holds the queue's consumer lock from poll to append, so
//! [`BatchQueue::drain_into`] and an appender on the same queue never
//! interleave their appends downstream.
//!
//! ```text
//! writers ──try_write──► Sequencer ──append──► BatchQueue
//!                                                  │ poll
//!                                                  ▼
//!                                           StorageAppender ──append──► storage
//! ```

use super::{AppendListener, LogStorage, StorageError};
use parking_lot::{Condvar, Mutex};
use seqlog_core::{Position, SequencedBatch};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// How long the appender waits for a batch before re-checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One batch waiting to be appended
pub struct PendingAppend {
    /// Lowest position in the batch
    pub lowest_position: Position,
    /// Highest position in the batch
    pub highest_position: Position,
    /// The batch itself
    pub batch: SequencedBatch,
    /// Listener supplied by the sequencer
    pub listener: Box<dyn AppendListener>,
}

impl PendingAppend {
    /// Forward this batch to `storage`
    pub fn append_to(self, storage: &dyn LogStorage) {
        storage.append(
            self.lowest_position,
            self.highest_position,
            self.batch,
            self.listener,
        );
    }
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<PendingAppend>,
    closed: bool,
}

/// FIFO of batches handed off by the sequencer
#[derive(Default)]
pub struct BatchQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    /// Held by whoever forwards batches downstream
    consumer: Mutex<()>,
}

impl BatchQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest batch without waiting
    pub fn try_poll(&self) -> Option<PendingAppend> {
        self.state.lock().queue.pop_front()
    }

    /// Take the oldest batch, waiting up to `timeout` for one to arrive
    ///
    /// Returns early with `None` once the queue is closed and empty.
    pub fn poll_timeout(&self, timeout: Duration) -> Option<PendingAppend> {
        let mut state = self.state.lock();
        if state.queue.is_empty() && !state.closed {
            self.available.wait_for(&mut state, timeout);
        }
        state.queue.pop_front()
    }

    /// Number of queued batches
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether no batch is queued
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Refuse new batches; queued ones can still be polled
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Forward every queued batch to `storage`, returning how many
    ///
    /// Waits for a running [`StorageAppender`] to finish its current batch;
    /// the two never forward concurrently.
    pub fn drain_into(&self, storage: &dyn LogStorage) -> usize {
        let _consumer = self.consumer.lock();
        let mut drained = 0;
        while let Some(pending) = self.try_poll() {
            pending.append_to(storage);
            drained += 1;
        }
        drained
    }
}

impl LogStorage for BatchQueue {
    fn append(
        &self,
        lowest_position: Position,
        highest_position: Position,
        batch: SequencedBatch,
        listener: Box<dyn AppendListener>,
    ) {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            listener.on_write_error(&StorageError::Closed);
            return;
        }
        state.queue.push_back(PendingAppend {
            lowest_position,
            highest_position,
            batch,
            listener,
        });
        drop(state);
        self.available.notify_one();
    }
}

/// Background thread moving batches from a [`BatchQueue`] into storage
pub struct StorageAppender {
    queue: Arc<BatchQueue>,
    handle: Option<JoinHandle<usize>>,
}

impl StorageAppender {
    /// Start the appender thread
    pub fn spawn(queue: Arc<BatchQueue>, storage: Arc<dyn LogStorage>) -> std::io::Result<Self> {
        let worker_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name("seqlog-appender".to_string())
            .spawn(move || run(&worker_queue, storage.as_ref()))?;
        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    /// The queue this appender drains
    pub fn queue(&self) -> &Arc<BatchQueue> {
        &self.queue
    }

    /// Close the queue, append what is left and join the thread
    ///
    /// Returns the number of batches the thread appended, or `None` if it
    /// panicked.
    pub fn shutdown(mut self) -> Option<usize> {
        self.stop()
    }

    fn stop(&mut self) -> Option<usize> {
        self.queue.close();
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for StorageAppender {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(queue: &BatchQueue, storage: &dyn LogStorage) -> usize {
    info!("Storage appender started");
    let mut appended = 0usize;
    loop {
        let _consumer = queue.consumer.lock();
        match queue.poll_timeout(POLL_INTERVAL) {
            Some(pending) => {
                debug!(
                    lowest_position = pending.lowest_position,
                    highest_position = pending.highest_position,
                    "Appending batch"
                );
                pending.append_to(storage);
                appended += 1;
            }
            None if queue.is_closed() && queue.is_empty() => break,
            None => {}
        }
    }
    info!(appended, "Storage appender stopped");
    appended
}
