//! Integration tests for the vehicle cloud sync engine
//!
//! End-to-end tests driving the `VehicleSyncService` facade against the
//! scripted mock API from `vcsync-core::testing`:
//! - scheduler ticks, staleness and recovery
//! - command execution, timeout and late reconciliation
//! - capability gating and change notifications
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vcsync-tests
//! ```
//!
//! All tests run under a paused tokio clock, so multi-minute scheduler
//! scenarios complete instantly and deterministically.

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test tracing subscriber once per process. Honors
/// `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
