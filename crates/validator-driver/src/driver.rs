// crates/validator-driver/src/driver.rs
// ============================================================================
// Module: Backtest Driver
// Description: Ties rewriting, execution, parsing, and classification into
//              the single-window contract C4 exposes, plus its rate-limit
//              retry wrapper.
// Purpose: Implement "given a program and a WindowSpec, run exactly one
//          backtest and return one WindowOutcome."
// Dependencies: crate::{classify, engine, parse, retry, rewriter, window}
// ============================================================================

//! ## Overview
//! [`run_window`] is the unwrapped, single-attempt contract. [`run_window_with_retry`]
//! wraps it in the shared retry-policy abstraction, retrying only on a
//! rate-limited outcome, up to a bounded attempt count with randomized
//! backoff between attempts.

use std::time::Duration;

use crate::classify::classify;
use crate::engine::DriverError;
use crate::engine::ExecutionClient;
use crate::parse::parse_statistics_map;
use crate::parse::parse_textual_fallback;
use crate::retry::RetryDecision;
use crate::retry::RetryPolicy;
use crate::rewriter::rewrite_dates;
use crate::window::WindowOutcome;
use crate::window::WindowSpec;

/// Default number of driver-level attempts for a rate-limited window.
pub const DEFAULT_RATE_LIMIT_ATTEMPTS: u32 = 3;

// ============================================================================
// SECTION: Single attempt
// ============================================================================

/// Runs exactly one backtest of `program` over `window` and returns one
/// classified [`WindowOutcome`].
///
/// # Errors
///
/// Returns [`DriverError`] only when the execution client itself could not
/// produce a result (a fatal, non-classifiable failure).
pub fn run_window(
    client: &dyn ExecutionClient,
    program: &str,
    window: &WindowSpec,
) -> Result<WindowOutcome, DriverError> {
    let rewritten = rewrite_dates(program, window);
    let raw = client.execute(&rewritten, window)?;

    let metrics = raw
        .statistics
        .as_ref()
        .and_then(parse_statistics_map)
        .or_else(|| parse_textual_fallback(&raw.combined_output));

    Ok(classify(window.id, raw.exit_code, &raw.combined_output, metrics))
}

// ============================================================================
// SECTION: Retry wrapper
// ============================================================================

/// Runs [`run_window`], retrying only on a rate-limited outcome, up to
/// `policy`'s attempt budget, sleeping (via `sleep`) 30-60s between
/// attempts. A surviving rate-limit after retries is returned as-is.
///
/// # Errors
///
/// Returns [`DriverError`] when the final attempt itself was fatal.
pub fn run_window_with_retry(
    client: &dyn ExecutionClient,
    program: &str,
    window: &WindowSpec,
    policy: RetryPolicy,
    sleep: impl FnMut(Duration),
) -> Result<WindowOutcome, DriverError> {
    policy.run(
        |_attempt| run_window(client, program, window),
        |result| match result {
            Ok(outcome) if outcome.rate_limited => RetryDecision::Retry,
            Ok(_) => RetryDecision::Succeed,
            Err(_) => RetryDecision::Fail,
        },
        sleep,
    )
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
    use std::cell::RefCell;
    use std::collections::HashMap;

    use time::Date;
    use time::Month;
    use validator_ids::WindowId;

    use super::*;
    use crate::engine::RawResult;

    struct ScriptedClient {
        responses: RefCell<Vec<RawResult>>,
    }

    impl ExecutionClient for ScriptedClient {
        fn execute(&self, _program: &str, _window: &WindowSpec) -> Result<RawResult, DriverError> {
            Ok(self.responses.borrow_mut().remove(0))
        }
    }

    fn window() -> WindowSpec {
        WindowSpec::new(
            WindowId::new(1.try_into().expect("non-zero")),
            Date::from_calendar_date(2012, Month::January, 1).expect("valid date"),
            Date::from_calendar_date(2023, Month::December, 31).expect("valid date"),
        )
    }

    fn success_statistics() -> HashMap<String, String> {
        let mut statistics = HashMap::new();
        statistics.insert("Sharpe Ratio".to_string(), "1.20".to_string());
        statistics.insert("Compounding Annual Return".to_string(), "12.0%".to_string());
        statistics.insert("Drawdown".to_string(), "14.0%".to_string());
        statistics.insert("Alpha".to_string(), "2.0%".to_string());
        statistics.insert("Net Profit".to_string(), "20.0%".to_string());
        statistics.insert("Win Rate".to_string(), "55.0%".to_string());
        statistics.insert("Total Orders".to_string(), "42".to_string());
        statistics
    }

    #[test]
    fn single_attempt_classifies_a_clean_success() {
        let client = ScriptedClient {
            responses: RefCell::new(vec![RawResult {
                exit_code: 0,
                combined_output: "ok".to_string(),
                statistics: Some(success_statistics()),
            }]),
        };
        let outcome = run_window(&client, "class Strat(QCAlgorithm):\n    def Initialize(self):\n        pass\n", &window())
            .expect("outcome");
        assert!(outcome.success);
    }

    #[test]
    fn retry_wrapper_retries_on_rate_limit_and_returns_eventual_success() {
        let client = ScriptedClient {
            responses: RefCell::new(vec![
                RawResult {
                    exit_code: 1,
                    combined_output: "rate limit exceeded".to_string(),
                    statistics: None,
                },
                RawResult {
                    exit_code: 0,
                    combined_output: "ok".to_string(),
                    statistics: Some(success_statistics()),
                },
            ]),
        };
        let mut sleeps = 0;
        let outcome = run_window_with_retry(
            &client,
            "class Strat(QCAlgorithm):\n    def Initialize(self):\n        pass\n",
            &window(),
            RetryPolicy::new(3),
            |_| sleeps += 1,
        )
        .expect("outcome");
        assert!(outcome.success);
        assert_eq!(sleeps, 1);
    }

    #[test]
    fn retry_wrapper_surfaces_surviving_rate_limit() {
        let client = ScriptedClient {
            responses: RefCell::new(vec![
                RawResult { exit_code: 1, combined_output: "rate limit".to_string(), statistics: None },
                RawResult { exit_code: 1, combined_output: "rate limit".to_string(), statistics: None },
                RawResult { exit_code: 1, combined_output: "rate limit".to_string(), statistics: None },
            ]),
        };
        let outcome = run_window_with_retry(
            &client,
            "class Strat(QCAlgorithm):\n    def Initialize(self):\n        pass\n",
            &window(),
            RetryPolicy::new(3),
            |_| {},
        )
        .expect("outcome");
        assert!(outcome.rate_limited);
    }
}
