// crates/validator-driver/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: A single retry-policy abstraction shared by C4 and C5.
// Purpose: Replace ad-hoc retry/back-off mixed into call sites with one
//          policy parameterized by (max_attempts, base_delay, classifier).
// Dependencies: rand, std::time::Duration
// ============================================================================

//! ## Overview
//! C4's rate-limit retries and C5's correction loop are both instances of
//! the same shape: attempt an action, classify the result, retry with
//! backoff or stop. [`RetryPolicy::run`] takes an attempt closure, a
//! classifier, and a sleep hook so callers can inject deterministic sleep
//! behavior in tests.

use std::time::Duration;

use rand::Rng;

const MIN_BACKOFF_SECS: u64 = 30;
const MAX_BACKOFF_SECS: u64 = 60;

// ============================================================================
// SECTION: Decision type
// ============================================================================

/// What the policy should do after observing one attempt's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then try again (subject to the attempt budget).
    Retry,
    /// Stop and return this result as a success.
    Succeed,
    /// Stop and return this result as a failure; do not retry.
    Fail,
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// A bounded-attempt retry policy with randomized backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Builds a policy with the given attempt budget.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Runs `attempt` up to `max_attempts` times, asking `classify` what to
    /// do after each one and calling `sleep` (with a 30-60s backoff) before
    /// any retry. Returns the last attempt's result whether it succeeded,
    /// failed outright, or exhausted its attempt budget while retryable.
    pub fn run<T>(
        &self,
        mut attempt: impl FnMut(u32) -> T,
        mut classify: impl FnMut(&T) -> RetryDecision,
        mut sleep: impl FnMut(Duration),
    ) -> T {
        let mut rng = rand::thread_rng();
        let mut attempt_number = 1;
        loop {
            let result = attempt(attempt_number);
            let decision = classify(&result);
            let exhausted = attempt_number >= self.max_attempts;
            if matches!(decision, RetryDecision::Succeed | RetryDecision::Fail) || exhausted {
                return result;
            }
            sleep(backoff_delay(&mut rng));
            attempt_number += 1;
        }
    }
}

/// Returns a randomized 30-60s backoff delay.
fn backoff_delay(rng: &mut impl Rng) -> Duration {
    Duration::from_secs(rng.gen_range(MIN_BACKOFF_SECS..=MAX_BACKOFF_SECS))
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

    #[test]
    fn stops_immediately_on_succeed() {
        let policy = RetryPolicy::new(3);
        let mut attempts = 0;
        let mut sleeps = 0;
        let result = policy.run(
            |_| {
                attempts += 1;
                "ok"
            },
            |_| RetryDecision::Succeed,
            |_| sleeps += 1,
        );
        assert_eq!(result, "ok");
        assert_eq!(attempts, 1);
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn retries_until_attempt_budget_is_exhausted() {
        let policy = RetryPolicy::new(3);
        let mut attempts = 0;
        let mut sleeps = 0;
        let result = policy.run(
            |n| {
                attempts += 1;
                n
            },
            |_| RetryDecision::Retry,
            |_| sleeps += 1,
        );
        assert_eq!(result, 3);
        assert_eq!(attempts, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn fail_decision_stops_without_exhausting_budget() {
        let policy = RetryPolicy::new(5);
        let mut attempts = 0;
        let result = policy.run(
            |n| {
                attempts += 1;
                n
            },
            |_| RetryDecision::Fail,
            |_| panic!("should not sleep"),
        );
        assert_eq!(result, 1);
        assert_eq!(attempts, 1);
    }
}
