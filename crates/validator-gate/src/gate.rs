// crates/validator-gate/src/gate.rs
// ============================================================================
// Module: Gate Evaluator
// Description: Threshold comparisons over an aggregated walk-forward (C7).
// Purpose: Produce an ordered list of GateResults and an overall pass flag.
// Dependencies: crate::aggregate
// ============================================================================

//! ## Overview
//! Each gate is applied only when its aggregate is present; a missing
//! aggregate is never treated as a pass. The four threshold gates from
//! `spec.md` §4.7 run first, in table order, followed by a fifth
//! significance gate appended after them so existing gate ordering is
//! unaffected by its addition.

use serde::Deserialize;
use serde::Serialize;

use crate::aggregate::AggregateMetrics;

// ============================================================================
// SECTION: Gate configuration
// ============================================================================

/// The fixed, config-provided thresholds a walk-forward is checked
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateBundle {
    /// Minimum acceptable aggregate Sharpe.
    #[serde(default = "default_min_sharpe")]
    pub min_sharpe: f64,
    /// Minimum acceptable consistency (fraction of successful windows
    /// with positive CAGR).
    #[serde(default = "default_min_consistency")]
    pub min_consistency: f64,
    /// Maximum acceptable worst drawdown.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
    /// Minimum acceptable aggregate CAGR.
    #[serde(default = "default_min_cagr")]
    pub min_cagr: f64,
    /// Maximum acceptable Bonferroni-adjusted p-value.
    #[serde(default = "default_max_p_value")]
    pub max_p_value: f64,
}

impl Default for GateBundle {
    fn default() -> Self {
        Self {
            min_sharpe: default_min_sharpe(),
            min_consistency: default_min_consistency(),
            max_drawdown: default_max_drawdown(),
            min_cagr: default_min_cagr(),
            max_p_value: default_max_p_value(),
        }
    }
}

/// Default minimum aggregate Sharpe.
const fn default_min_sharpe() -> f64 {
    1.0
}

/// Default minimum consistency.
const fn default_min_consistency() -> f64 {
    0.6
}

/// Default maximum worst drawdown.
const fn default_max_drawdown() -> f64 {
    0.25
}

/// Default minimum aggregate CAGR.
const fn default_min_cagr() -> f64 {
    0.10
}

/// Mirrors the nearest default in `research_system/schemas/validation.py`.
const fn default_max_p_value() -> f64 {
    0.10
}

// ============================================================================
// SECTION: Gate results
// ============================================================================

/// The outcome of one gate comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Which gate this is.
    pub name: GateName,
    /// Whether the gate passed.
    pub passed: bool,
    /// The aggregate value compared, or `None` if the aggregate was
    /// unavailable (treated as a failing gate).
    pub observed: Option<f64>,
    /// The configured threshold.
    pub threshold: f64,
}

/// The five gates a walk-forward is checked against, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    /// Aggregate Sharpe must meet or exceed `min_sharpe`.
    MinSharpe,
    /// Consistency must meet or exceed `min_consistency`.
    MinConsistency,
    /// Worst drawdown must not exceed `max_drawdown`.
    MaxDrawdown,
    /// Aggregate CAGR must meet or exceed `min_cagr`.
    MinCagr,
    /// Bonferroni-adjusted p-value must not exceed `max_p_value`.
    Significance,
}

/// The full result of evaluating a walk-forward against a [`GateBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    /// One result per gate, in evaluation order.
    pub results: Vec<GateResult>,
    /// True only when every gate passed.
    pub all_passed: bool,
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates `aggregate` (or its absence) against `bundle`, producing an
/// ordered [`GateReport`].
///
/// A `None` aggregate fails every gate: there is nothing to compare against
/// a missing result.
#[must_use]
pub fn evaluate_gates(aggregate: Option<&AggregateMetrics>, bundle: GateBundle) -> GateReport {
    let results = vec![
        gate_result(GateName::MinSharpe, aggregate.map(|a| a.aggregate_sharpe), bundle.min_sharpe, |o, t| o >= t),
        gate_result(GateName::MinConsistency, aggregate.map(|a| a.consistency), bundle.min_consistency, |o, t| {
            o >= t
        }),
        gate_result(GateName::MaxDrawdown, aggregate.map(|a| a.worst_drawdown), bundle.max_drawdown, |o, t| o <= t),
        gate_result(GateName::MinCagr, aggregate.map(|a| a.aggregate_cagr), bundle.min_cagr, |o, t| o >= t),
        gate_result(
            GateName::Significance,
            aggregate.map(|a| a.p_value_adjusted),
            bundle.max_p_value,
            |o, t| o <= t,
        ),
    ];
    let all_passed = results.iter().all(|result| result.passed);
    GateReport { results, all_passed }
}

/// Builds one gate result, treating a missing observation as a failure.
fn gate_result(name: GateName, observed: Option<f64>, threshold: f64, compare: impl Fn(f64, f64) -> bool) -> GateResult {
    let passed = observed.is_some_and(|value| compare(value, threshold));
    GateResult { name, passed, observed, threshold }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "test-only assertions and fixtures"
    )]
    use super::*;

    fn passing_metrics() -> AggregateMetrics {
        AggregateMetrics {
            mean_cagr: 0.15,
            median_cagr: 0.15,
            aggregate_sharpe: 1.5,
            aggregate_cagr: 0.15,
            worst_drawdown: 0.20,
            consistency: 0.8,
            p_value: 0.01,
            p_value_adjusted: 0.01,
            regime_consistent: true,
        }
    }

    #[test]
    fn all_gates_pass_on_strong_metrics() {
        let report = evaluate_gates(Some(&passing_metrics()), GateBundle::default());
        assert!(report.all_passed);
        assert_eq!(report.results.len(), 5);
    }

    #[test]
    fn missing_aggregate_fails_every_gate() {
        let report = evaluate_gates(None, GateBundle::default());
        assert!(!report.all_passed);
        assert!(report.results.iter().all(|r| !r.passed));
    }

    #[test]
    fn drawdown_gate_is_inclusive_at_the_boundary() {
        let mut metrics = passing_metrics();
        metrics.worst_drawdown = GateBundle::default().max_drawdown;
        let report = evaluate_gates(Some(&metrics), GateBundle::default());
        let drawdown = report.results.iter().find(|r| r.name == GateName::MaxDrawdown).expect("present");
        assert!(drawdown.passed);
    }

    #[test]
    fn significance_gate_fails_when_adjusted_p_value_exceeds_threshold() {
        let mut metrics = passing_metrics();
        metrics.p_value_adjusted = 0.50;
        let report = evaluate_gates(Some(&metrics), GateBundle::default());
        let significance = report.results.iter().find(|r| r.name == GateName::Significance).expect("present");
        assert!(!significance.passed);
        assert!(!report.all_passed);
    }

    #[test]
    fn significance_gate_is_appended_after_the_four_threshold_gates() {
        let report = evaluate_gates(Some(&passing_metrics()), GateBundle::default());
        assert_eq!(report.results[4].name, GateName::Significance);
        assert_eq!(report.results[0].name, GateName::MinSharpe);
    }
}
