//! Tracing subscriber setup.
//!
//! Every crate in the workspace logs through `tracing` with structured
//! fields. The level is taken from `RUST_LOG` when set, otherwise from the
//! argument:
//!
//! | Level | Events |
//! |-------|--------|
//! | `error` | storage write failures |
//! | `warn` | commit reported before write |
//! | `info` | sequencer open/close, appender start/stop |
//! | `debug` | flow-control rejections, limit changes |
//! | `trace` | accepted writes, released permits |

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a console subscriber at `default_level`.
///
/// Panics if a global subscriber is already installed.
pub fn init(default_level: &str) {
    subscriber(default_level).init();
}

/// Install a console subscriber at `default_level`, unless one exists.
pub fn try_init(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    subscriber(default_level).try_init()
}

/// Install a quiet subscriber for tests; repeated calls are harmless.
pub fn init_testing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(default_level: &str) -> impl SubscriberInitExt {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(true))
}
