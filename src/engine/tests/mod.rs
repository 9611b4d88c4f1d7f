mod tests_flush;
mod tests_recovery;
mod tests_rotation;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::engine::EngineConfig;

/// Initializes the tracing subscriber from `RUST_LOG`. Safe to call more
/// than once — only the first call takes effect.
pub(super) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A config with a tick interval long enough that no test observing
/// pre-flush state races the background worker.
pub(super) fn config_no_background_activity() -> EngineConfig {
    init_tracing();
    EngineConfig {
        tick_interval: Duration::from_secs(3600),
        ..EngineConfig::default()
    }
}

pub(super) fn config_with_fast_tick(memtable_capacity: usize, level_threshold: usize) -> EngineConfig {
    init_tracing();
    EngineConfig {
        memtable_capacity,
        level_threshold,
        tick_interval: Duration::from_millis(30),
    }
}
