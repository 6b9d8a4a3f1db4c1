// crates/validator-driver/src/classify.rs
// ============================================================================
// Module: Outcome Classification
// Description: Fixed-priority classification of a raw backtest result.
// Purpose: Map engine output to a WindowOutcome (C4 §4.4 classification).
// Dependencies: crate::window
// ============================================================================

//! ## Overview
//! Classification follows a fixed priority, checked in order: engine crash,
//! rate limit, nonzero exit, an in-band error marker, then a parsed numeric
//! result (subject to a zero-trades override). Each step is checked only
//! when the previous ones did not already decide the outcome.

use validator_ids::WindowId;

use crate::window::WindowMetrics;
use crate::window::WindowOutcome;

/// Closed list of substrings that indicate the engine process itself
/// crashed, rather than the user's program failing.
pub const ENGINE_CRASH_PATTERNS: &[&str] = &[
    "PAL_SEHException",
    "core dumped",
    "FATAL UNHANDLED EXCEPTION",
    "Segmentation fault",
];

/// Closed list of substrings that indicate the engine refused to accept
/// work due to capacity, not a problem with the program under test.
pub const RATE_LIMIT_PATTERNS: &[&str] = &[
    "no spare nodes",
    "rate limit",
    "too many requests",
    "capacity limit",
    "maximum number of projects",
];

/// In-band error marker the engine prints ahead of a user-code failure
/// message.
pub const ERROR_OCCURRED_MARKER: &str = "An error occurred during this backtest:";

/// Reason text used for the zero-trades override.
pub const ZERO_TRADES_REASON: &str = "zero trades executed";

const TRUNCATED_TAIL_CHARS: usize = 400;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a raw backtest result into a [`WindowOutcome`].
///
/// `metrics` is `None` when no numeric result could be parsed from either
/// the remote API or the textual fallback.
#[must_use]
pub fn classify(
    window: WindowId,
    exit_code: i32,
    combined_output: &str,
    metrics: Option<WindowMetrics>,
) -> WindowOutcome {
    if contains_any(combined_output, ENGINE_CRASH_PATTERNS) {
        return WindowOutcome::engine_crash(window, "engine crash".to_string());
    }

    if exit_code != 0 && contains_any(combined_output, RATE_LIMIT_PATTERNS) {
        return WindowOutcome::rate_limited(window, "rate limited".to_string());
    }

    if exit_code != 0 {
        return WindowOutcome::failure(window, truncated_tail(combined_output));
    }

    if let Some(after) = combined_output.split(ERROR_OCCURRED_MARKER).nth(1) {
        return WindowOutcome::failure(window, after.trim().to_string());
    }

    match metrics {
        Some(metrics) if metrics.total_trades == 0 => {
            WindowOutcome::failure(window, ZERO_TRADES_REASON.to_string())
        }
        Some(metrics) => WindowOutcome::success(window, metrics),
        None => WindowOutcome::failure(window, "unable to parse backtest output".to_string()),
    }
}

/// Returns true when `haystack` contains any of `patterns`.
fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| haystack.contains(pattern))
}

/// Returns the last [`TRUNCATED_TAIL_CHARS`] characters of `text`, trimmed.
fn truncated_tail(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= TRUNCATED_TAIL_CHARS {
        return trimmed.to_string();
    }
    let start = trimmed.len() - TRUNCATED_TAIL_CHARS;
    let boundary = (start..trimmed.len())
        .find(|&i| trimmed.is_char_boundary(i))
        .unwrap_or(start);
    trimmed[boundary..].to_string()
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

    fn window() -> WindowId {
        WindowId::new(1.try_into().expect("non-zero"))
    }

    fn sample_metrics(total_trades: u64) -> WindowMetrics {
        WindowMetrics {
            sharpe: 1.2,
            cagr: 0.12,
            max_drawdown: 0.14,
            alpha: 0.02,
            net_profit: 0.2,
            win_rate: 0.55,
            total_trades,
        }
    }

    #[test]
    fn engine_crash_takes_priority_over_everything_else() {
        let outcome = classify(window(), 0, "...core dumped...rate limit...", Some(sample_metrics(42)));
        assert!(outcome.engine_crash);
        assert!(!outcome.success);
    }

    #[test]
    fn rate_limit_requires_nonzero_exit() {
        let clean_exit = classify(window(), 0, "rate limit exceeded", Some(sample_metrics(42)));
        assert!(!clean_exit.rate_limited);

        let nonzero_exit = classify(window(), 1, "rate limit exceeded", None);
        assert!(nonzero_exit.rate_limited);
    }

    #[test]
    fn nonzero_exit_without_known_pattern_is_a_plain_failure() {
        let outcome = classify(window(), 1, "some unexpected crash text", None);
        assert!(!outcome.success && !outcome.engine_crash && !outcome.rate_limited);
    }

    #[test]
    fn in_band_error_marker_is_extracted() {
        let output = "An error occurred during this backtest: ZeroDivisionError: division by zero";
        let outcome = classify(window(), 0, output, None);
        assert_eq!(outcome.reason.as_deref(), Some("ZeroDivisionError: division by zero"));
    }

    #[test]
    fn zero_trades_overrides_an_otherwise_successful_result() {
        let outcome = classify(window(), 0, "ok", Some(sample_metrics(0)));
        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some(ZERO_TRADES_REASON));
    }

    #[test]
    fn nonzero_trades_with_no_errors_succeeds() {
        let outcome = classify(window(), 0, "ok", Some(sample_metrics(42)));
        assert!(outcome.success);
        assert_eq!(outcome.metrics.expect("metrics").total_trades, 42);
    }

    #[test]
    fn unparseable_output_with_clean_exit_fails() {
        let outcome = classify(window(), 0, "ok", None);
        assert!(!outcome.success);
    }
}
