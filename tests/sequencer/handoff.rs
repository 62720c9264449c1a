//! Hand-off Tests
//!
//! The sequencer writes into a queue and a dedicated appender thread moves
//! batches to storage in submission order.

use crate::*;
use seqlog::{BatchQueue, StorageAppender, StorageError, WriteErrorHandler};
use parking_lot::Mutex;
use std::sync::{mpsc, Barrier};
use std::thread;
use std::time::Duration;

fn queued_sequencer(
    config: SequencerConfig,
) -> (Arc<Sequencer>, Arc<BatchQueue>, Arc<InMemoryLogStorage>) {
    seqlog::logging::init_testing();
    let queue = Arc::new(BatchQueue::new());
    let storage = Arc::new(InMemoryLogStorage::new());
    let sequencer = Sequencer::new(&config, queue.clone() as Arc<dyn LogStorage>).unwrap();
    (Arc::new(sequencer), queue, storage)
}

#[test]
fn test_appender_preserves_submission_order() {
    const NUM_WRITERS: usize = 4;
    const WRITES_PER_THREAD: usize = 50;

    let (sequencer, queue, storage) = queued_sequencer(unlimited_config());
    let appender =
        StorageAppender::spawn(queue, storage.clone() as Arc<dyn LogStorage>).unwrap();
    let barrier = Arc::new(Barrier::new(NUM_WRITERS));

    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|i| {
            let sequencer = Arc::clone(&sequencer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for j in 0..WRITES_PER_THREAD {
                    sequencer
                        .try_write(entries(1 + (i + j) % 3), -1, CommandType::InternalCommand)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(appender.shutdown(), Some(NUM_WRITERS * WRITES_PER_THREAD));

    let records = storage.records();
    assert_eq!(records.len(), NUM_WRITERS * WRITES_PER_THREAD);
    for pair in records.windows(2) {
        assert_eq!(pair[1].lowest_position, pair[0].highest_position + 1);
    }
    assert_eq!(
        sequencer.metrics().last_committed_position(),
        sequencer.next_position() - 1
    );
}

#[test]
fn test_commit_through_appender_frees_capacity() {
    let (sequencer, queue, storage) = queued_sequencer(user_limited_config(1));

    sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .unwrap();
    assert!(sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .is_err());

    // nothing reaches storage until the queue is drained
    assert!(storage.records().is_empty());
    assert_eq!(queue.drain_into(storage.as_ref()), 1);

    assert!(sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .is_ok());
}

#[derive(Default)]
struct Failures(Mutex<Vec<(i64, i64)>>);

impl WriteErrorHandler for Failures {
    fn on_write_failure(&self, lowest: i64, highest: i64, _error: &StorageError) {
        self.0.lock().push((lowest, highest));
    }
}

#[test]
fn test_closed_queue_reports_write_errors() {
    let failures = Arc::new(Failures::default());
    let queue = Arc::new(BatchQueue::new());
    let sequencer = Sequencer::new(&unlimited_config(), queue.clone() as Arc<dyn LogStorage>)
        .unwrap()
        .with_error_handler(failures.clone());

    queue.close();
    // the sequencer still accepts the write; storage reports the failure
    assert_eq!(
        sequencer.try_write(entries(2), -1, CommandType::UserCommand),
        Ok(2)
    );
    assert_eq!(*failures.0.lock(), vec![(1, 2)]);
    assert_eq!(sequencer.metrics().snapshot().write_errors, 1);
}

/// Closes the sequencer it is attached to on the first storage failure
#[derive(Default)]
struct CloseOnFailure(Mutex<Option<std::sync::Weak<Sequencer>>>);

impl WriteErrorHandler for CloseOnFailure {
    fn on_write_failure(&self, _lowest: i64, _highest: i64, _error: &StorageError) {
        let sequencer = self.0.lock().as_ref().and_then(|s| s.upgrade());
        if let Some(sequencer) = sequencer {
            sequencer.close();
        }
    }
}

#[test]
fn test_handler_closing_sequencer_does_not_block_writer() {
    let handler = Arc::new(CloseOnFailure::default());
    let queue = Arc::new(BatchQueue::new());
    let sequencer = Arc::new(
        Sequencer::new(&user_limited_config(4), queue.clone() as Arc<dyn LogStorage>)
            .unwrap()
            .with_error_handler(handler.clone()),
    );
    *handler.0.lock() = Some(Arc::downgrade(&sequencer));
    queue.close();

    let (tx, rx) = mpsc::channel();
    let writer = Arc::clone(&sequencer);
    thread::spawn(move || {
        let result = writer.try_write(entries(1), -1, CommandType::UserCommand);
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("writer blocked after handler closed the sequencer");
    assert_eq!(result, Ok(1));
    assert!(sequencer.is_closed());
    assert_eq!(
        sequencer.try_write(entries(1), -1, CommandType::UserCommand),
        Err(seqlog::WriteFailure::Closed)
    );
    assert_eq!(
        sequencer
            .flow_control()
            .limiter(CommandType::UserCommand)
            .unwrap()
            .in_flight(),
        0
    );
}
