//! `env_logger` bootstrap.
//!
//! The crate only logs through the `log` facade. Hosts that already install
//! a logger can skip this module; the helpers here are for binaries, benches
//! and tests that want output without wiring one up. `RUST_LOG` overrides
//! the default filter. Every helper is safe to call more than once.

use env_logger::{Builder, Env};


/// Installs a logger defaulting to `warn`. Returns `false` if a logger was
/// already installed.
pub fn init() -> bool {
    init_with_filter("warn")
}

/// Installs a logger defaulting to `filter` (for example
/// `"particle_entity_bridge=debug"`).
pub fn init_with_filter(filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(filter)).try_init().is_ok()
}

/// Installs a test-friendly logger that writes through the test harness's
/// capture.
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug")).is_test(true).try_init();
}
