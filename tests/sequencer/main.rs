//! Sequencer Test Suite
//!
//! End-to-end tests of the write path: position assignment, admission
//! control, lifecycle, the frames that reach storage, and the hand-off to a
//! storage thread.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test sequencer
//! cargo test --test sequencer ordering::
//! ```

use std::sync::Arc;

use seqlog::flow::FlowControlConfig;
use seqlog::{
    CommandType, Entry, InMemoryLogStorage, LimiterConfig, LogStorage, Sequencer, SequencerConfig,
};

// Test modules
pub mod admission;
pub mod handoff;
pub mod ordering;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// A valid entry with a distinct key
pub fn entry(key: i64) -> Entry {
    Entry::new(key, "meta", format!("value-{}", key))
}

/// `n` valid entries with keys `0..n`
pub fn entries(n: usize) -> Vec<Entry> {
    (0..n as i64).map(entry).collect()
}

/// Config with every class unlimited
pub fn unlimited_config() -> SequencerConfig {
    SequencerConfig::default().with_flow_control(FlowControlConfig::unlimited())
}

/// Config limiting only user commands to `limit` batches in flight
pub fn user_limited_config(limit: usize) -> SequencerConfig {
    SequencerConfig::default().with_flow_control(
        FlowControlConfig::unlimited()
            .with(CommandType::UserCommand, LimiterConfig::Fixed { limit }),
    )
}

/// Sequencer over storage that completes only on request
pub fn manual_sequencer(config: SequencerConfig) -> (Arc<Sequencer>, Arc<InMemoryLogStorage>) {
    seqlog::logging::init_testing();
    let storage = Arc::new(InMemoryLogStorage::manual());
    let sequencer = Sequencer::new(&config, storage.clone() as Arc<dyn LogStorage>).unwrap();
    (Arc::new(sequencer), storage)
}

/// Sequencer over storage that completes every append immediately
pub fn immediate_sequencer(config: SequencerConfig) -> (Arc<Sequencer>, Arc<InMemoryLogStorage>) {
    seqlog::logging::init_testing();
    let storage = Arc::new(InMemoryLogStorage::new());
    let sequencer = Sequencer::new(&config, storage.clone() as Arc<dyn LogStorage>).unwrap();
    (Arc::new(sequencer), storage)
}
