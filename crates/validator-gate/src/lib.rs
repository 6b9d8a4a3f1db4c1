// crates/validator-gate/src/lib.rs
// ============================================================================
// Module: Validator Gate
// Description: Walk-forward aggregation and gate evaluation.
// Purpose: Implement C6 (aggregator) and C7 (gate evaluator).
// Dependencies: validator-ids, validator-driver
// ============================================================================

//! ## Overview
//! [`aggregate`] turns a list of per-window outcomes into a [`WalkForward`],
//! short-circuiting on rate-limit or engine-crash outcomes before any
//! averaging happens. [`gate`] then compares the resulting aggregate, if
//! any, against a configured [`GateBundle`]. [`schedule`] enumerates the
//! window sets a walk-forward can be run over.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod gate;
pub mod schedule;

pub use aggregate::AggregateMetrics;
pub use aggregate::Determination;
pub use aggregate::WalkForward;
pub use aggregate::aggregate as run_aggregate;
pub use gate::GateBundle;
pub use gate::GateName;
pub use gate::GateReport;
pub use gate::GateResult;
pub use gate::evaluate_gates;
pub use schedule::WindowSchedule;
