// crates/validator-driver/src/lib.rs
// ============================================================================
// Module: Validator Driver
// Description: Runs generated programs against walk-forward windows.
// Purpose: Implement the backtest driver (C4) and error-correction loop (C5).
// Dependencies: validator-ids, validator-codegen, validator-verify, reqwest
// ============================================================================

//! ## Overview
//! This crate implements C4 and C5 of the validation pipeline. [`driver`]
//! is the single-window contract: rewrite dates, execute, parse, classify.
//! [`correction`] wraps it for the first window only, asking the generator
//! to fix correctable failures. [`engine`] provides the two execution
//! modes; [`retry`] is the shared retry-policy abstraction both C4's
//! rate-limit handling and C5's correction loop are built from.

#![forbid(unsafe_code)]

pub mod classify;
pub mod correction;
pub mod driver;
pub mod engine;
pub mod parse;
pub mod retry;
pub mod rewriter;
pub mod window;

pub use correction::CorrectionResult;
pub use correction::run_first_window_with_correction;
pub use driver::run_window;
pub use driver::run_window_with_retry;
pub use engine::CloudExecutionClient;
pub use engine::DriverError;
pub use engine::ExecutionClient;
pub use engine::LocalExecutionClient;
pub use engine::ProjectDirStrategy;
pub use engine::RawResult;
pub use retry::RetryDecision;
pub use retry::RetryPolicy;
pub use rewriter::rewrite_dates;
pub use window::WindowMetrics;
pub use window::WindowOutcome;
pub use window::WindowSpec;
