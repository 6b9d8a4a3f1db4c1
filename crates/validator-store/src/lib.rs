// crates/validator-store/src/lib.rs
// ============================================================================
// Module: Validator Store
// Description: Filesystem persistence adapter and configuration surface.
// Purpose: Implement C9 (persistence) plus the ambient config-loading stack.
// Dependencies: validator-ids, validator-core, validator-gate, validator-verify
// ============================================================================

//! ## Overview
//! [`layout`] owns the file-tree shape and the one atomic-write primitive
//! everything else uses. [`adapter`] translates candidate-level operations
//! ("load", "list pending", "move to validated", "write determination")
//! into reads and writes against a [`layout::WorkspaceLayout`]. [`config`]
//! loads `config.toml` into the thresholds the rest of the pipeline runs
//! against.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod layout;

pub use adapter::StoreAdapter;
pub use adapter::StoreError;
pub use config::BacktestConfig;
pub use config::Config;
pub use config::ConfigError;
pub use config::ExecutionMode;
pub use layout::WorkspaceLayout;
pub use layout::atomic_write;
