//! Flow-control configuration
//!
//! One [`LimiterConfig`] per limited command class. Follow-up events are
//! never limited and have no entry here.
//!
//! ```toml
//! [flow_control.user_commands]
//! algorithm = "aimd"
//! initial_limit = 50
//! backoff_ratio = 0.75
//!
//! [flow_control.user_commands.window]
//! window_size = 5
//!
//! [flow_control.internal_commands]
//! algorithm = "fixed"
//! limit = 200
//!
//! [flow_control.inter_partition_commands]
//! algorithm = "disabled"
//! ```

use crate::limit::{AimdLimit, FixedLimit, Limit, WindowedLimit};
use seqlog_core::CommandType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A limiter configuration that cannot be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidLimiterConfig(pub String);

/// Sample aggregation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Shortest window duration in milliseconds
    pub min_window_time_ms: u64,
    /// Longest window duration in milliseconds
    pub max_window_time_ms: u64,
    /// Samples required before a window may close
    pub window_size: usize,
    /// Samples faster than this (microseconds) are ignored
    pub min_rtt_threshold_us: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            min_window_time_ms: 1000,
            max_window_time_ms: 1000,
            window_size: 10,
            min_rtt_threshold_us: 100,
        }
    }
}

/// Windowed AIMD parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimdConfig {
    /// Limit before any sample was observed
    pub initial_limit: usize,
    /// Lower bound of the limit
    pub min_limit: usize,
    /// Upper bound of the limit
    pub max_limit: usize,
    /// Factor applied to the limit on overload, in `[0.5, 1.0)`
    pub backoff_ratio: f64,
    /// Latency (milliseconds) above which a request counts as overload
    pub request_timeout_ms: u64,
    /// Sample aggregation window
    pub window: WindowConfig,
}

impl Default for AimdConfig {
    fn default() -> Self {
        AimdConfig {
            initial_limit: 100,
            min_limit: 1,
            max_limit: 1000,
            backoff_ratio: 0.9,
            request_timeout_ms: 200,
            window: WindowConfig::default(),
        }
    }
}

/// Admission policy of one command class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum LimiterConfig {
    /// Adaptive limit: windowed additive increase, multiplicative decrease
    Aimd(AimdConfig),
    /// Constant limit
    Fixed {
        /// Maximum number of batches in flight
        limit: usize,
    },
    /// No limit at all
    Disabled,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        LimiterConfig::Aimd(AimdConfig::default())
    }
}

impl LimiterConfig {
    /// Check that the parameters can be built into a limit
    pub fn validate(&self) -> Result<(), InvalidLimiterConfig> {
        let invalid = |msg: String| Err(InvalidLimiterConfig(msg));
        match self {
            LimiterConfig::Aimd(aimd) => {
                if aimd.min_limit == 0 {
                    return invalid("min_limit must be at least 1".to_string());
                }
                if aimd.min_limit > aimd.max_limit {
                    return invalid(format!(
                        "min_limit {} exceeds max_limit {}",
                        aimd.min_limit, aimd.max_limit
                    ));
                }
                if aimd.initial_limit < aimd.min_limit || aimd.initial_limit > aimd.max_limit {
                    return invalid(format!(
                        "initial_limit {} outside [{}, {}]",
                        aimd.initial_limit, aimd.min_limit, aimd.max_limit
                    ));
                }
                if !(0.5..1.0).contains(&aimd.backoff_ratio) {
                    return invalid(format!(
                        "backoff_ratio {} outside [0.5, 1.0)",
                        aimd.backoff_ratio
                    ));
                }
                if aimd.window.window_size == 0 {
                    return invalid("window_size must be at least 1".to_string());
                }
                if aimd.window.min_window_time_ms > aimd.window.max_window_time_ms {
                    return invalid(format!(
                        "min_window_time_ms {} exceeds max_window_time_ms {}",
                        aimd.window.min_window_time_ms, aimd.window.max_window_time_ms
                    ));
                }
                Ok(())
            }
            LimiterConfig::Fixed { limit } if *limit == 0 => {
                invalid("fixed limit must be at least 1".to_string())
            }
            LimiterConfig::Fixed { .. } | LimiterConfig::Disabled => Ok(()),
        }
    }

    /// Build the limit algorithm, `None` when disabled
    pub fn build_limit(&self) -> Option<Box<dyn Limit>> {
        match self {
            LimiterConfig::Aimd(aimd) => {
                let core = AimdLimit::new(
                    aimd.initial_limit,
                    aimd.min_limit,
                    aimd.max_limit,
                    aimd.backoff_ratio,
                    Duration::from_millis(aimd.request_timeout_ms),
                );
                Some(Box::new(WindowedLimit::new(
                    core,
                    Duration::from_millis(aimd.window.min_window_time_ms),
                    Duration::from_millis(aimd.window.max_window_time_ms),
                    aimd.window.window_size,
                    Duration::from_micros(aimd.window.min_rtt_threshold_us),
                )))
            }
            LimiterConfig::Fixed { limit } => Some(Box::new(FixedLimit::new(*limit))),
            LimiterConfig::Disabled => None,
        }
    }
}

/// Limiter configuration of every limited command class
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowControlConfig {
    /// Commands sent by clients
    pub user_commands: LimiterConfig,
    /// Commands generated by the engine
    pub internal_commands: LimiterConfig,
    /// Commands sent by other partitions
    pub inter_partition_commands: LimiterConfig,
}

impl FlowControlConfig {
    /// No class is limited
    pub fn unlimited() -> Self {
        FlowControlConfig {
            user_commands: LimiterConfig::Disabled,
            internal_commands: LimiterConfig::Disabled,
            inter_partition_commands: LimiterConfig::Disabled,
        }
    }

    /// Replace the configuration of one class
    ///
    /// Follow-up events are never limited, so setting them is a no-op.
    pub fn with(mut self, command_type: CommandType, config: LimiterConfig) -> Self {
        match command_type {
            CommandType::UserCommand => self.user_commands = config,
            CommandType::InternalCommand => self.internal_commands = config,
            CommandType::InterPartitionCommand => self.inter_partition_commands = config,
            CommandType::FollowUpEvents => {}
        }
        self
    }

    /// Configuration of one class, `None` for follow-up events
    pub fn for_command(&self, command_type: CommandType) -> Option<&LimiterConfig> {
        match command_type {
            CommandType::UserCommand => Some(&self.user_commands),
            CommandType::InternalCommand => Some(&self.internal_commands),
            CommandType::InterPartitionCommand => Some(&self.inter_partition_commands),
            CommandType::FollowUpEvents => None,
        }
    }

    /// Validate every class, naming the first invalid one
    pub fn validate(&self) -> Result<(), InvalidLimiterConfig> {
        for command_type in CommandType::ALL {
            if let Some(config) = self.for_command(command_type) {
                config
                    .validate()
                    .map_err(|e| InvalidLimiterConfig(format!("{}: {}", command_type, e.0)))?;
            }
        }
        Ok(())
    }
}
