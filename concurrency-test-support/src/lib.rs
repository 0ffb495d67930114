//! Test-only helpers shared by the `loading-cache` and `concurrent-task`
//! test suites.
#![warn(missing_debug_implementations, missing_docs)]

use std::sync::Once;

pub use concurrency_time::MockProvider;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber driven by `RUST_LOG`, once per test
/// binary.
///
/// Safe to call from every test: subsequent calls after the first are
/// no-ops, so tests don't fight over the global subscriber.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}
