//! Sequencer configuration
//!
//! Loaded from TOML; every field has a default.
//!
//! ```toml
//! partition_id = 3
//! initial_position = 1
//! max_fragment_size = 4194304
//!
//! [flow_control.user_commands]
//! algorithm = "fixed"
//! limit = 100
//! ```

use seqlog_flow::{FlowControlConfig, InvalidLimiterConfig};
use seqlog_wire::framed_entry_length;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound of one batch's framed size (4 MiB)
pub const DEFAULT_MAX_FRAGMENT_SIZE: usize = 4 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A limiter configuration is invalid
    #[error("invalid flow control config: {0}")]
    FlowControl(#[from] InvalidLimiterConfig),
}

/// Configuration of one sequencer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Partition this sequencer writes for, used in logs
    pub partition_id: u32,
    /// Position of the first entry written
    pub initial_position: i64,
    /// Largest framed size of one batch, in bytes
    pub max_fragment_size: usize,
    /// Admission control per command class
    pub flow_control: FlowControlConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            partition_id: 1,
            initial_position: 1,
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            flow_control: FlowControlConfig::default(),
        }
    }
}

impl SequencerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SequencerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the initial position
    pub fn with_initial_position(mut self, position: i64) -> Self {
        self.initial_position = position;
        self
    }

    /// Replace the flow-control configuration
    pub fn with_flow_control(mut self, flow_control: FlowControlConfig) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set the maximum framed batch size
    pub fn with_max_fragment_size(mut self, max_fragment_size: usize) -> Self {
        self.max_fragment_size = max_fragment_size;
        self
    }

    /// Check all values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_position < 0 {
            return Err(ConfigError::Invalid(format!(
                "initial_position {} is negative",
                self.initial_position
            )));
        }
        let smallest_frame = framed_entry_length(1, 1);
        if self.max_fragment_size < smallest_frame {
            return Err(ConfigError::Invalid(format!(
                "max_fragment_size {} cannot hold a single frame of {} bytes",
                self.max_fragment_size, smallest_frame
            )));
        }
        self.flow_control.validate()?;
        Ok(())
    }
}
