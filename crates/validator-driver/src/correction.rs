// crates/validator-driver/src/correction.rs
// ============================================================================
// Module: Error-Correction Loop
// Description: C5 — ask the generator to fix a correctable first-window
//              failure, then re-run, up to a bounded attempt count.
// Purpose: Implement the correction loop as a simple driver over C4.
// Dependencies: crate::{driver, retry, window}, validator_codegen::llm
// Dependencies: validator_codegen::postprocess, validator_verify::candidate
// ============================================================================

//! ## Overview
//! Correction is attempted only for the first window of a walk-forward.
//! Subsequent windows reuse whatever program resulted from this loop
//! (corrected or not) without further correction, since windows within one
//! walk-forward are expected to share identical logic.

use std::time::Duration;

use validator_codegen::GeneratorClient;
use validator_codegen::LlmOutcome;
use validator_codegen::llm::extract_program;
use validator_codegen::postprocess;
use validator_verify::CandidateDocument;

use crate::driver::run_window_with_retry;
use crate::engine::ExecutionClient;
use crate::retry::RetryPolicy;
use crate::window::WindowOutcome;
use crate::window::WindowSpec;

/// Default bound on correction attempts for the first window.
pub const DEFAULT_MAX_CORRECTION_ATTEMPTS: u32 = 3;

/// Closed list of substrings identifying a runtime failure the generator
/// can plausibly fix by rewriting the program.
pub const CORRECTABLE_PATTERNS: &[&str] = &[
    "AttributeError:",
    "NameError: name",
    "TypeError:",
    "invalid syntax",
    "unexpected keyword argument",
    "Resolution.",
    "DataNormalizationMode",
    "is_ready",
    crate::classify::ZERO_TRADES_REASON,
];

/// Returns true when `reason` matches the closed list of correctable
/// failure patterns.
#[must_use]
pub fn is_correctable(reason: &str) -> bool {
    CORRECTABLE_PATTERNS.iter().any(|pattern| reason.contains(pattern))
}

/// Result of running the first window through the correction loop.
#[derive(Debug, Clone)]
pub struct CorrectionResult {
    /// The final outcome of the first window (success or exhausted failure).
    pub outcome: WindowOutcome,
    /// The program actually used to produce `outcome` (possibly corrected).
    pub program: String,
    /// How many backtest attempts were made against the first window,
    /// including the original, uncorrected attempt.
    pub correction_attempts: u32,
}

// ============================================================================
// SECTION: Correction loop
// ============================================================================

/// Runs the first-window correction loop: execute, and on a correctable
/// non-transient failure, ask `generator` for a fix and try again, up to
/// `max_attempts` total backtest attempts.
pub fn run_first_window_with_correction(
    execution: &dyn ExecutionClient,
    generator: &dyn GeneratorClient,
    candidate: &CandidateDocument,
    program: &str,
    window: &WindowSpec,
    retry_policy: RetryPolicy,
    max_attempts: u32,
    mut sleep: impl FnMut(Duration),
) -> CorrectionResult {
    let mut current_program = program.to_string();
    let mut attempts = 1;

    loop {
        let outcome = match run_window_with_retry(execution, &current_program, window, retry_policy, &mut sleep) {
            Ok(outcome) => outcome,
            Err(err) => {
                return CorrectionResult {
                    outcome: WindowOutcome::failure(window.id, err.to_string()),
                    program: current_program,
                    correction_attempts: attempts,
                };
            }
        };

        if outcome.success || outcome.engine_crash || outcome.rate_limited {
            return CorrectionResult { outcome, program: current_program, correction_attempts: attempts };
        }

        let Some(reason) = outcome.reason.clone() else {
            return CorrectionResult { outcome, program: current_program, correction_attempts: attempts };
        };

        if attempts >= max_attempts || !is_correctable(&reason) {
            return CorrectionResult { outcome, program: current_program, correction_attempts: attempts };
        }

        match generator.correct(&current_program, &reason, candidate) {
            Ok(LlmOutcome::Reply(reply)) => match extract_program(&reply) {
                Some(extracted) => {
                    current_program = postprocess(&extracted);
                    attempts += 1;
                }
                None => return CorrectionResult { outcome, program: current_program, correction_attempts: attempts },
            },
            _ => return CorrectionResult { outcome, program: current_program, correction_attempts: attempts },
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
