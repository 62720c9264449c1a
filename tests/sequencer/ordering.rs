//! Ordering Tests
//!
//! Accepted writes receive strictly increasing, contiguous, non-overlapping
//! ranges, whatever the interleaving of producers.

use crate::*;
use proptest::prelude::*;
use std::sync::Barrier;
use std::thread;

#[test]
fn test_initial_position_and_follow_up_range() {
    let (sequencer, _storage) =
        manual_sequencer(unlimited_config().with_initial_position(100));

    assert_eq!(
        sequencer.try_write(entries(3), -1, CommandType::FollowUpEvents),
        Ok(102)
    );
    sequencer
        .try_write(entries(1), -1, CommandType::FollowUpEvents)
        .unwrap();

    assert_eq!(sequencer.next_position(), 104);
}

#[test]
fn test_storage_sees_contiguous_ranges() {
    let (sequencer, storage) = immediate_sequencer(unlimited_config());
    for size in [1, 4, 2, 7, 1] {
        sequencer
            .try_write(entries(size), -1, CommandType::InternalCommand)
            .unwrap();
    }

    let records = storage.records();
    assert_eq!(records.first().map(|r| r.lowest_position), Some(1));
    for pair in records.windows(2) {
        assert_eq!(pair[1].lowest_position, pair[0].highest_position + 1);
    }
    assert_eq!(records.last().map(|r| r.highest_position), Some(15));
}

#[test]
fn test_concurrent_writers_get_disjoint_ranges() {
    const NUM_WRITERS: usize = 8;
    const WRITES_PER_THREAD: usize = 200;

    let (sequencer, storage) = immediate_sequencer(unlimited_config());
    let barrier = Arc::new(Barrier::new(NUM_WRITERS));

    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|i| {
            let sequencer = Arc::clone(&sequencer);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let mut ranges = Vec::with_capacity(WRITES_PER_THREAD);
                for j in 0..WRITES_PER_THREAD {
                    let size = 1 + (i + j) % 4;
                    let highest = sequencer
                        .try_write(entries(size), -1, CommandType::UserCommand)
                        .unwrap();
                    ranges.push((highest - size as i64 + 1, highest));
                }
                ranges
            })
        })
        .collect();

    let mut ranges: Vec<(i64, i64)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ranges.sort_unstable();

    assert_eq!(ranges[0].0, 1);
    for pair in ranges.windows(2) {
        assert_eq!(pair[1].0, pair[0].1 + 1, "gap or overlap between {:?}", pair);
    }

    // storage received the same ranges, already in order
    let stored: Vec<_> = storage
        .records()
        .iter()
        .map(|r| (r.lowest_position, r.highest_position))
        .collect();
    assert_eq!(stored, ranges);
}

proptest! {
    #[test]
    fn prop_accepted_ranges_are_contiguous(
        initial in 0i64..1_000_000,
        sizes in prop::collection::vec(1usize..16, 1..40),
    ) {
        let (sequencer, _storage) =
            manual_sequencer(unlimited_config().with_initial_position(initial));

        let mut expected_lowest = initial;
        for size in sizes {
            let highest = sequencer
                .try_write(entries(size), -1, CommandType::FollowUpEvents)
                .unwrap();
            prop_assert_eq!(highest, expected_lowest + size as i64 - 1);
            expected_lowest = highest + 1;
        }
        prop_assert_eq!(sequencer.next_position(), expected_lowest);
    }

    #[test]
    fn prop_rejections_never_consume_positions(
        ops in prop::collection::vec((1usize..5, any::<bool>()), 1..50),
    ) {
        let (sequencer, _storage) = manual_sequencer(unlimited_config());

        let mut expected_next = 1i64;
        for (size, valid) in ops {
            let mut batch = entries(size);
            if !valid {
                batch[size - 1].value.clear();
            }
            match sequencer.try_write(batch, -1, CommandType::InternalCommand) {
                Ok(highest) => {
                    prop_assert!(valid);
                    prop_assert_eq!(highest, expected_next + size as i64 - 1);
                    expected_next = highest + 1;
                }
                Err(_) => prop_assert!(!valid),
            }
            prop_assert_eq!(sequencer.next_position(), expected_next);
        }
    }
}
