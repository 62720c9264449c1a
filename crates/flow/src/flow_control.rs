//! Routing of admission and acknowledgment by command class
//!
//! [`FlowControl`] owns one [`AdmissionPolicy`] per limited command class.
//! Follow-up events always get [`AdmissionPolicy::Unlimited`]: once the
//! command that produced them was admitted they must never be rejected.

use crate::config::FlowControlConfig;
use crate::limiter::{Limiter, LimiterStats};
use seqlog_core::{CommandType, Intent, Position};
use tracing::debug;

/// How writes of one command class are admitted
#[derive(Debug)]
pub enum AdmissionPolicy {
    /// Admission is decided by a limiter
    Limited(Limiter),
    /// Every write is admitted
    Unlimited,
}

static UNLIMITED: AdmissionPolicy = AdmissionPolicy::Unlimited;

impl AdmissionPolicy {
    fn build(command_type: CommandType, config: &FlowControlConfig) -> Self {
        match config
            .for_command(command_type)
            .and_then(|c| c.build_limit())
        {
            Some(limit) => AdmissionPolicy::Limited(Limiter::new(command_type, limit)),
            None => AdmissionPolicy::Unlimited,
        }
    }

    /// The limiter, if this class is limited
    pub fn limiter(&self) -> Option<&Limiter> {
        match self {
            AdmissionPolicy::Limited(limiter) => Some(limiter),
            AdmissionPolicy::Unlimited => None,
        }
    }
}

/// Admission control for all command classes
#[derive(Debug)]
pub struct FlowControl {
    user_commands: AdmissionPolicy,
    internal_commands: AdmissionPolicy,
    inter_partition_commands: AdmissionPolicy,
}

impl FlowControl {
    /// Build limiters from `config`
    ///
    /// Call [`FlowControlConfig::validate`] first; invalid bounds are
    /// clamped rather than reported here.
    pub fn new(config: &FlowControlConfig) -> Self {
        let flow_control = Self {
            user_commands: AdmissionPolicy::build(CommandType::UserCommand, config),
            internal_commands: AdmissionPolicy::build(CommandType::InternalCommand, config),
            inter_partition_commands: AdmissionPolicy::build(
                CommandType::InterPartitionCommand,
                config,
            ),
        };
        debug!(
            limited = flow_control.limiters().count(),
            "Flow control initialized"
        );
        flow_control
    }

    /// Flow control that admits everything
    pub fn unlimited() -> Self {
        Self::new(&FlowControlConfig::unlimited())
    }

    /// Admission policy of `command_type`
    pub fn admission(&self, command_type: CommandType) -> &AdmissionPolicy {
        match command_type {
            CommandType::UserCommand => &self.user_commands,
            CommandType::InternalCommand => &self.internal_commands,
            CommandType::InterPartitionCommand => &self.inter_partition_commands,
            CommandType::FollowUpEvents => &UNLIMITED,
        }
    }

    /// Limiter of `command_type`, if it is limited
    pub fn limiter(&self, command_type: CommandType) -> Option<&Limiter> {
        self.admission(command_type).limiter()
    }

    /// Try to admit a batch whose highest position is `position`
    pub fn try_acquire(&self, command_type: CommandType, position: Position, intent: Intent) -> bool {
        match self.admission(command_type) {
            AdmissionPolicy::Limited(limiter) => limiter.try_acquire(position, intent),
            AdmissionPolicy::Unlimited => true,
        }
    }

    /// Acknowledge every batch up to and including `position`
    pub fn on_response(&self, position: Position) {
        for limiter in self.limiters() {
            limiter.on_response(position);
        }
    }

    /// Release every batch up to and including `position` as failed
    pub fn on_dropped(&self, position: Position) {
        for limiter in self.limiters() {
            limiter.on_dropped(position);
        }
    }

    /// Stats of every configured limiter
    pub fn stats(&self) -> Vec<LimiterStats> {
        self.limiters().map(Limiter::stats).collect()
    }

    fn limiters(&self) -> impl Iterator<Item = &Limiter> {
        [
            &self.user_commands,
            &self.internal_commands,
            &self.inter_partition_commands,
        ]
        .into_iter()
        .filter_map(AdmissionPolicy::limiter)
    }
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new(&FlowControlConfig::default())
    }
}
