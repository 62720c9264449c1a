//! Admission Tests
//!
//! Flow control rejects writes with FULL without consuming positions, frees
//! capacity on cumulative acknowledgment, and never limits follow-up events.

use crate::*;
use seqlog::flow::{AimdConfig, WindowConfig};
use seqlog::{Intent, StorageError, WriteFailure};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;

#[test]
fn test_limit_one_rejects_second_write_until_acknowledged() {
    let (sequencer, _storage) = manual_sequencer(user_limited_config(1));

    let first = sequencer
        .try_write(entries(2), -1, CommandType::UserCommand)
        .unwrap();
    let second = sequencer.try_write(entries(1), -1, CommandType::UserCommand);
    assert_eq!(
        second,
        Err(WriteFailure::Full {
            command_type: CommandType::UserCommand
        })
    );
    assert!(second.unwrap_err().is_retryable());

    sequencer.acknowledge_position(first);
    let third = sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .unwrap();

    // the rejected write did not consume a position
    assert_eq!(third, first + 1);
}

#[test]
fn test_acknowledgment_is_cumulative() {
    let (sequencer, _storage) = manual_sequencer(user_limited_config(3));
    let highs: Vec<_> = (0..3)
        .map(|_| {
            sequencer
                .try_write(entries(1), -1, CommandType::UserCommand)
                .unwrap()
        })
        .collect();
    assert!(sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .is_err());

    // acknowledging the last range releases all three
    sequencer.acknowledge_position(highs[2]);
    let limiter = sequencer
        .flow_control()
        .limiter(CommandType::UserCommand)
        .unwrap();
    assert_eq!(limiter.in_flight(), 0);

    // stale acknowledgments are no-ops
    sequencer.acknowledge_position(highs[0]);
    sequencer.acknowledge_position(highs[2]);
    assert_eq!(limiter.in_flight(), 0);
}

#[test]
fn test_out_of_order_commits_fold() {
    let (sequencer, storage) = manual_sequencer(user_limited_config(3));
    for _ in 0..3 {
        sequencer
            .try_write(entries(1), -1, CommandType::UserCommand)
            .unwrap();
    }

    // the last batch commits first and releases everything below it
    assert!(storage.complete_at(2));
    let limiter = sequencer
        .flow_control()
        .limiter(CommandType::UserCommand)
        .unwrap();
    assert_eq!(limiter.in_flight(), 0);

    assert_eq!(storage.complete_all(), 2);
    assert_eq!(sequencer.metrics().last_committed_position(), 3);
}

#[test]
fn test_follow_up_events_bypass_full_limiters() {
    let config = SequencerConfig::default().with_flow_control(
        FlowControlConfig::unlimited()
            .with(CommandType::UserCommand, LimiterConfig::Fixed { limit: 1 })
            .with(CommandType::InternalCommand, LimiterConfig::Fixed { limit: 1 })
            .with(
                CommandType::InterPartitionCommand,
                LimiterConfig::Fixed { limit: 1 },
            ),
    );
    let (sequencer, _storage) = manual_sequencer(config);
    for command_type in [
        CommandType::UserCommand,
        CommandType::InternalCommand,
        CommandType::InterPartitionCommand,
    ] {
        sequencer.try_write(entries(1), -1, command_type).unwrap();
        assert!(sequencer.try_write(entries(1), -1, command_type).is_err());
    }

    for _ in 0..100 {
        assert!(sequencer
            .try_write(entries(1), 1, CommandType::FollowUpEvents)
            .is_ok());
    }
}

#[test]
fn test_classes_limited_independently() {
    let config = user_limited_config(1).with_flow_control(
        FlowControlConfig::unlimited()
            .with(CommandType::UserCommand, LimiterConfig::Fixed { limit: 1 })
            .with(CommandType::InternalCommand, LimiterConfig::Fixed { limit: 2 }),
    );
    let (sequencer, _storage) = manual_sequencer(config);

    sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .unwrap();
    assert!(sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .is_err());

    assert!(sequencer
        .try_write(entries(1), -1, CommandType::InternalCommand)
        .is_ok());
    assert!(sequencer
        .try_write(entries(1), -1, CommandType::InternalCommand)
        .is_ok());
    assert!(sequencer
        .try_write(entries(1), -1, CommandType::InternalCommand)
        .is_err());
}

#[test]
fn test_admission_uses_first_entry_intent() {
    let (sequencer, _storage) = manual_sequencer(user_limited_config(4));
    let batch = vec![entry(1).with_intent(Intent(7)), entry(2).with_intent(Intent(3))];
    let highest = sequencer
        .try_write(batch, -1, CommandType::UserCommand)
        .unwrap();

    let pending = sequencer
        .flow_control()
        .limiter(CommandType::UserCommand)
        .unwrap()
        .pending();
    assert_eq!(pending, vec![(highest, Intent(7))]);
}

#[test]
fn test_write_failure_backs_off_aimd_limit() {
    let config = SequencerConfig::default().with_flow_control(FlowControlConfig::unlimited().with(
        CommandType::UserCommand,
        LimiterConfig::Aimd(AimdConfig {
            initial_limit: 10,
            min_limit: 1,
            max_limit: 100,
            backoff_ratio: 0.5,
            window: WindowConfig {
                window_size: 1,
                ..Default::default()
            },
            ..Default::default()
        }),
    ));
    let (sequencer, storage) = manual_sequencer(config);
    let limiter = sequencer
        .flow_control()
        .limiter(CommandType::UserCommand)
        .unwrap();
    assert_eq!(limiter.limit(), 10);

    sequencer
        .try_write(entries(1), -1, CommandType::UserCommand)
        .unwrap();
    storage.fail_next(StorageError::Rejected("replication lost".to_string()));

    // a one-sample window hands the drop straight to AIMD
    assert_eq!(limiter.limit(), 5);
    assert_eq!(limiter.stats().dropped, 1);
    assert_eq!(sequencer.metrics().snapshot().write_errors, 1);
}

#[test]
fn test_concurrent_writers_respect_limit() {
    const NUM_WRITERS: usize = 8;
    const LIMIT: usize = 5;

    let (sequencer, _storage) = manual_sequencer(user_limited_config(LIMIT));
    let barrier = Arc::new(Barrier::new(NUM_WRITERS));

    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|_| {
            let sequencer = Arc::clone(&sequencer);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                (0..10)
                    .filter(|_| {
                        sequencer
                            .try_write(entries(1), -1, CommandType::UserCommand)
                            .is_ok()
                    })
                    .count()
            })
        })
        .collect();

    let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(accepted, LIMIT);
    assert_eq!(sequencer.next_position(), 1 + LIMIT as i64);

    let stats = sequencer.metrics().snapshot();
    assert_eq!(stats.rejected_full, (NUM_WRITERS * 10 - LIMIT) as u64);
}

#[test]
fn test_concurrent_acknowledgments_while_writing() {
    const NUM_WRITERS: usize = 4;
    const NUM_ACKERS: usize = 3;
    const WRITES_PER_THREAD: usize = 200;
    const LIMIT: usize = 4;

    let (sequencer, _storage) = manual_sequencer(user_limited_config(LIMIT));
    let barrier = Arc::new(Barrier::new(NUM_WRITERS + NUM_ACKERS));
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..NUM_WRITERS)
        .map(|_| {
            let sequencer = Arc::clone(&sequencer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut accepted = Vec::new();
                let mut full = 0usize;
                for _ in 0..WRITES_PER_THREAD {
                    match sequencer.try_write(entries(1), -1, CommandType::UserCommand) {
                        Ok(position) => accepted.push(position),
                        Err(WriteFailure::Full { .. }) => full += 1,
                        Err(other) => panic!("unexpected failure: {}", other),
                    }
                }
                (accepted, full)
            })
        })
        .collect();

    let ackers: Vec<_> = (0..NUM_ACKERS)
        .map(|_| {
            let sequencer = Arc::clone(&sequencer);
            let barrier = Arc::clone(&barrier);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                barrier.wait();
                let limiter = sequencer
                    .flow_control()
                    .limiter(CommandType::UserCommand)
                    .unwrap();
                while !done.load(Ordering::Acquire) {
                    let highest = sequencer.next_position() - 1;
                    if highest >= 1 {
                        // overlapping and repeated acknowledgments
                        sequencer.acknowledge_position(highest);
                        sequencer.acknowledge_position(highest);
                        sequencer.acknowledge_position((highest - 3).max(1));
                    }
                    assert!(limiter.in_flight() <= LIMIT);
                    thread::yield_now();
                }
            })
        })
        .collect();

    let mut accepted = Vec::new();
    let mut full = 0usize;
    for h in writers {
        let (positions, rejected) = h.join().unwrap();
        accepted.extend(positions);
        full += rejected;
    }
    done.store(true, Ordering::Release);
    for h in ackers {
        h.join().unwrap();
    }

    assert_eq!(accepted.len() + full, NUM_WRITERS * WRITES_PER_THREAD);
    accepted.sort_unstable();
    let expected: Vec<_> = (1..=accepted.len() as i64).collect();
    assert_eq!(accepted, expected);
    assert_eq!(sequencer.next_position(), accepted.len() as i64 + 1);

    let limiter = sequencer
        .flow_control()
        .limiter(CommandType::UserCommand)
        .unwrap();
    let outstanding = limiter.in_flight();
    assert_eq!(limiter.on_response(sequencer.next_position() - 1), outstanding);
    assert_eq!(limiter.on_response(sequencer.next_position() - 1), 0);

    let stats = limiter.stats();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.accepted, accepted.len() as u64);
    assert_eq!(stats.rejected, full as u64);
    assert_eq!(sequencer.metrics().snapshot().rejected_full, full as u64);
}

#[test]
fn test_stats_serialize_for_export() {
    let (sequencer, storage) = manual_sequencer(user_limited_config(2));
    sequencer
        .try_write(entries(3), -1, CommandType::UserCommand)
        .unwrap();
    storage.complete_all();

    let metrics = serde_json::to_value(sequencer.metrics().snapshot()).unwrap();
    assert_eq!(metrics["entries_appended"], 3);
    assert_eq!(metrics["last_committed_position"], 3);

    let limiters = serde_json::to_value(sequencer.flow_control().stats()).unwrap();
    assert_eq!(limiters[0]["command_type"], "USER_COMMAND");
    assert_eq!(limiters[0]["limit"], 2);
    assert_eq!(limiters[0]["in_flight"], 0);
}
