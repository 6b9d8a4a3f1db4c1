// crates/validator-gate/src/aggregate.rs
// ============================================================================
// Module: Walk-Forward Aggregator
// Description: Aggregates per-window outcomes into a WalkForward (C6).
// Purpose: Implement §4.6 aggregation, short-circuit rules, and the
//          statistical-significance supplement of §4.7a.
// Dependencies: validator-driver::window
// ============================================================================

//! ## Overview
//! Aggregation runs only over successful windows; a failed window never
//! contributes to mean/median/consistency. Two outcome shapes short-circuit
//! before aggregation runs at all: a rate-limited window (RETRY_LATER) and
//! an engine-crash window (BLOCKED).

use serde::Deserialize;
use serde::Serialize;
use validator_driver::WindowOutcome;

// ============================================================================
// SECTION: Determination
// ============================================================================

/// The outcome-level verdict threaded from the aggregator through the gate
/// evaluator to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determination {
    /// All gates passed.
    Validated,
    /// At least one gate failed.
    Invalidated,
    /// Validated with a caveat (sanity flags or regime inconsistency).
    Conditional,
    /// Permanently rejected before reaching a determination.
    Blocked,
    /// Transient failure; candidate should be retried in a future run.
    RetryLater,
    /// Not yet decided; awaiting the gate evaluator.
    Pending,
    /// Unrecoverable system error.
    Failed,
}

// ============================================================================
// SECTION: Aggregate metrics
// ============================================================================

/// Metrics computed over the successful windows of a walk-forward run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Arithmetic mean CAGR over successful windows.
    pub mean_cagr: f64,
    /// Median CAGR over successful windows.
    pub median_cagr: f64,
    /// Arithmetic mean Sharpe over successful windows.
    pub aggregate_sharpe: f64,
    /// Arithmetic mean CAGR over successful windows (retained alongside
    /// `mean_cagr`, which it may equal, for downstream reporting).
    pub aggregate_cagr: f64,
    /// Maximum drawdown observed across successful windows.
    pub worst_drawdown: f64,
    /// Fraction of successful windows with positive CAGR.
    pub consistency: f64,
    /// One-sided p-value for the hypothesis that mean Sharpe is positive.
    pub p_value: f64,
    /// Bonferroni-adjusted p-value (denominator fixed at 1 in this
    /// implementation; see the significance gate).
    pub p_value_adjusted: f64,
    /// Whether every successful window's CAGR agrees in sign.
    pub regime_consistent: bool,
}

/// Result of running a complete walk-forward over one generated program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForward {
    /// Every window outcome, in schedule order.
    pub outcomes: Vec<WindowOutcome>,
    /// Aggregates over the successful subset, present only when at least
    /// one window succeeded and no short-circuit fired.
    pub aggregate: Option<AggregateMetrics>,
    /// The aggregator's own determination, left `Pending` for the gate
    /// evaluator unless a short-circuit or all-windows-failed rule fired.
    pub determination: Determination,
    /// Human-readable reason, populated whenever `determination` is not
    /// `Pending`.
    pub reason: Option<String>,
    /// True when `determination` represents a transient condition the
    /// candidate should be retried for later.
    pub is_transient: bool,
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Aggregates `outcomes` (assumed to be in schedule order, already
/// short-circuited by the caller at the first rate-limit/crash outcome)
/// into a [`WalkForward`].
#[must_use]
pub fn aggregate(outcomes: Vec<WindowOutcome>) -> WalkForward {
    if let Some(short_circuit_window) = outcomes.iter().find(|outcome| outcome.rate_limited).map(|outcome| outcome.window) {
        return WalkForward {
            outcomes,
            aggregate: None,
            determination: Determination::RetryLater,
            reason: Some("rate limited during walk-forward".to_string()),
            is_transient: true,
        }
        .with_outcomes_truncated_at(short_circuit_window);
    }

    if let Some(short_circuit_window) = outcomes.iter().find(|outcome| outcome.engine_crash).map(|outcome| outcome.window) {
        return WalkForward {
            outcomes,
            aggregate: None,
            determination: Determination::Blocked,
            reason: Some("engine crash".to_string()),
            is_transient: false,
        }
        .with_outcomes_truncated_at(short_circuit_window);
    }

    let successful: Vec<&WindowOutcome> = outcomes.iter().filter(|outcome| outcome.success).collect();

    if successful.is_empty() {
        return WalkForward {
            outcomes,
            aggregate: None,
            determination: Determination::Blocked,
            reason: Some("no successful backtest windows".to_string()),
            is_transient: false,
        };
    }

    let cagrs: Vec<f64> = successful.iter().filter_map(|o| o.metrics.map(|m| m.cagr)).collect();
    let sharpes: Vec<f64> = successful.iter().filter_map(|o| o.metrics.map(|m| m.sharpe)).collect();
    let drawdowns: Vec<f64> = successful.iter().filter_map(|o| o.metrics.map(|m| m.max_drawdown)).collect();

    let mean_cagr = mean(&cagrs);
    let median_cagr = median(&cagrs);
    let aggregate_sharpe = mean(&sharpes);
    let aggregate_cagr = mean(&cagrs);
    let worst_drawdown = drawdowns.iter().copied().fold(f64::MIN, f64::max);
    let consistency = cagrs.iter().filter(|cagr| **cagr > 0.0).count() as f64 / cagrs.len() as f64;
    let (p_value, p_value_adjusted) = significance(&sharpes);
    let regime_consistent = cagrs.iter().all(|cagr| *cagr > 0.0) || cagrs.iter().all(|cagr| *cagr <= 0.0);

    WalkForward {
        outcomes,
        aggregate: Some(AggregateMetrics {
            mean_cagr,
            median_cagr,
            aggregate_sharpe,
            aggregate_cagr,
            worst_drawdown,
            consistency,
            p_value,
            p_value_adjusted,
            regime_consistent,
        }),
        determination: Determination::Pending,
        reason: None,
        is_transient: false,
    }
}

impl WalkForward {
    /// Drops any recorded outcome after `window` (inclusive), matching
    /// C6's "return immediately" short-circuit semantics.
    fn with_outcomes_truncated_at(mut self, window: validator_ids::WindowId) -> Self {
        if let Some(position) = self.outcomes.iter().position(|outcome| outcome.window == window) {
            self.outcomes.truncate(position + 1);
        }
        self
    }
}

/// Arithmetic mean, or 0.0 for an empty slice.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median, or 0.0 for an empty slice. For an even-length slice, the mean
/// of the two middle elements.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Bonferroni denominator: the number of gates treated as
/// significance-bearing. Fixed at 1 (the Sharpe gate only).
const SIGNIFICANCE_BEARING_GATE_COUNT: f64 = 1.0;

/// One-sided p-value (normal approximation of a one-sample t-test) for the
/// hypothesis that the true mean Sharpe is positive, plus its
/// Bonferroni-adjusted counterpart.
///
/// A standard error needs at least two windows to estimate; with fewer,
/// there is no sample to reject, so the gate passes trivially rather than
/// failing every single-window walk-forward by construction.
fn significance(sharpes: &[f64]) -> (f64, f64) {
    if sharpes.len() < 2 {
        return (0.0, 0.0);
    }
    let sample_mean = mean(sharpes);
    let variance = sharpes.iter().map(|s| (s - sample_mean).powi(2)).sum::<f64>() / (sharpes.len() - 1) as f64;
    let std_error = (variance / sharpes.len() as f64).sqrt();
    if std_error == 0.0 {
        let p = if sample_mean > 0.0 { 0.0 } else { 1.0 };
        return (p, (p * SIGNIFICANCE_BEARING_GATE_COUNT).min(1.0));
    }
    let t_stat = sample_mean / std_error;
    let p_value = 1.0 - standard_normal_cdf(t_stat);
    (p_value, (p_value * SIGNIFICANCE_BEARING_GATE_COUNT).min(1.0))
}

/// Standard normal CDF via the Abramowitz-Stegun error-function approximation.
fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz-Stegun 7.1.26 approximation of the error function.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;
    let t = 1.0 / (1.0 + p * x);
    let poly = ((((a5 * t + a4) * t + a3) * t + a2) * t + a1) * t;
    sign * (1.0 - poly * (-x * x).exp())
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
    use validator_driver::WindowMetrics;
    use validator_ids::WindowId;

    use super::*;

    fn window_id(n: u32) -> WindowId {
        WindowId::new(n.try_into().expect("non-zero"))
    }

    fn success(n: u32, cagr: f64, sharpe: f64, drawdown: f64) -> WindowOutcome {
        WindowOutcome::success(
            window_id(n),
            WindowMetrics {
                sharpe,
                cagr,
                max_drawdown: drawdown,
                alpha: 0.02,
                net_profit: cagr,
                win_rate: 0.5,
                total_trades: 10,
            },
        )
    }

    #[test]
    fn aggregation_ignores_failed_windows() {
        let outcomes = vec![
            success(1, 0.10, 1.0, 0.10),
            WindowOutcome::failure(window_id(2), "unrelated failure".to_string()),
            success(3, 0.20, 2.0, 0.20),
        ];
        let result = aggregate(outcomes);
        let aggregate = result.aggregate.expect("aggregate present");
        assert!((aggregate.mean_cagr - 0.15).abs() < 1e-9);
        assert!((aggregate.consistency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rate_limited_window_short_circuits_to_retry_later() {
        let outcomes = vec![success(1, 0.10, 1.0, 0.10), WindowOutcome::rate_limited(window_id(2), "rl".to_string())];
        let result = aggregate(outcomes);
        assert_eq!(result.determination, Determination::RetryLater);
        assert!(result.is_transient);
        assert_eq!(result.outcomes.len(), 2);
    }

    #[test]
    fn engine_crash_short_circuits_to_blocked() {
        let outcomes = vec![WindowOutcome::engine_crash(window_id(1), "crash".to_string())];
        let result = aggregate(outcomes);
        assert_eq!(result.determination, Determination::Blocked);
        assert!(!result.is_transient);
    }

    #[test]
    fn zero_successful_windows_blocks_with_named_reason() {
        let outcomes = vec![WindowOutcome::failure(window_id(1), "zero trades executed".to_string())];
        let result = aggregate(outcomes);
        assert_eq!(result.determination, Determination::Blocked);
        assert_eq!(result.reason.as_deref(), Some("no successful backtest windows"));
    }

    #[test]
    fn zero_successful_windows_consistency_would_be_zero_not_divide_by_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn median_of_even_length_sequence_is_mean_of_two_middle_elements() {
        assert!((median(&[0.10, 0.30, 0.20, 0.40]) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn regime_consistent_requires_uniform_sign_across_successful_windows() {
        let outcomes = vec![success(1, 0.10, 1.0, 0.10), success(2, -0.05, 0.5, 0.10)];
        let result = aggregate(outcomes);
        assert!(!result.aggregate.expect("aggregate").regime_consistent);
    }

    #[test]
    fn single_window_walk_forward_does_not_fail_significance_by_construction() {
        let outcomes = vec![success(1, 0.15, 1.5, 0.10)];
        let result = aggregate(outcomes);
        let aggregate = result.aggregate.expect("aggregate present");
        assert_eq!(aggregate.p_value_adjusted, 0.0);
    }
}
