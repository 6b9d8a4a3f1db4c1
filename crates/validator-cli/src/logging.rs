// crates/validator-cli/src/logging.rs
// ============================================================================
// Module: Logging Initialization
// Description: Wires a tracing subscriber honoring VALIDATOR_LOG.
// Purpose: Give operators env-filter control over log verbosity.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Verbosity defaults to `info` and can be overridden by setting
//! [`VALIDATOR_LOG_ENV`] to any `tracing-subscriber` filter directive
//! (e.g. `validator_driver=debug`). Output always goes to stderr so stdout
//! stays reserved for command results.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity.
pub const VALIDATOR_LOG_ENV: &str = "VALIDATOR_LOG";

/// Initializes the global tracing subscriber. Safe to call once at process
/// start; a second call is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(VALIDATOR_LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
