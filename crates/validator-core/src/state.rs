// crates/validator-core/src/state.rs
// ============================================================================
// Module: Orchestrator State Machine
// Description: Candidate lifecycle states, transitions, and the sanity-flag
//              and final-determination rules that decide a candidate's fate.
// Purpose: Implement C8 of the validation pipeline.
// Dependencies: crate::time, validator-gate, validator-ids, serde, thiserror
// ============================================================================

//! ## Overview
//! One [`CandidateRun`] tracks a single candidate through the fixed state
//! sequence `initialized -> hypothesis_locked -> data_audit -> is_testing ->
//! statistical -> regime -> oos_testing -> determination -> completed`, with
//! the permanent side-tracks `blocked` and `failed` reachable from any
//! non-terminal state. Every transition is appended to `history`, never
//! rewritten. The *oos_testing* stage is one-shot: a second submission is an
//! [`CoreError::OosAlreadySubmitted`], and the run's recorded state is left
//! untouched by the rejected attempt.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use validator_gate::Determination;
use validator_gate::GateReport;
use validator_gate::WalkForward;
use validator_ids::CandidateId;

// ============================================================================
// SECTION: States
// ============================================================================

/// One state in the candidate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    /// The run has been created but no stage has started.
    Initialized,
    /// The hypothesis, windows, and data requirements are locked in.
    HypothesisLocked,
    /// Declared data requirements are being resolved and verified.
    DataAudit,
    /// In-sample backtests are running.
    IsTesting,
    /// Statistical significance is being assessed.
    Statistical,
    /// Regime consistency is being assessed.
    Regime,
    /// Out-of-sample backtests are running (one-shot).
    OosTesting,
    /// The final determination is being computed.
    Determination,
    /// The run has finished normally.
    Completed,
    /// Permanently rejected before reaching out-of-sample testing.
    Blocked,
    /// Stopped by an unrecoverable system error.
    Failed,
}

/// The ordered forward path every non-terminal state advances along.
const FORWARD_PATH: &[CandidateState] = &[
    CandidateState::Initialized,
    CandidateState::HypothesisLocked,
    CandidateState::DataAudit,
    CandidateState::IsTesting,
    CandidateState::Statistical,
    CandidateState::Regime,
    CandidateState::OosTesting,
    CandidateState::Determination,
    CandidateState::Completed,
];

impl CandidateState {
    /// Returns the state that immediately follows this one on the forward
    /// path, or `None` if this state has no forward successor (the
    /// terminal states, including `Completed`).
    #[must_use]
    fn next_on_forward_path(self) -> Option<CandidateState> {
        let position = FORWARD_PATH.iter().position(|state| *state == self)?;
        FORWARD_PATH.get(position + 1).copied()
    }

    /// Returns true once a run has left the forward path for good.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, CandidateState::Completed | CandidateState::Blocked | CandidateState::Failed)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the orchestrator state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The requested transition is not a legal forward or side-track move.
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// State the run was in.
        from: CandidateState,
        /// State the caller attempted to move to.
        to: CandidateState,
    },
    /// Out-of-sample results were submitted more than once for this run.
    #[error("out-of-sample results were already submitted for this run")]
    OosAlreadySubmitted,
    /// A downstream component tried to read hypothesis-lock fields that
    /// disagree with the values captured at `hypothesis_locked`.
    #[error("hypothesis lock mismatch: {0}")]
    HypothesisMismatch(String),
    /// The hypothesis has not been locked in yet.
    #[error("hypothesis has not been locked in")]
    HypothesisNotLocked,
}

// ============================================================================
// SECTION: State history
// ============================================================================

/// One append-only entry in a run's transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// State the run moved from.
    pub from: CandidateState,
    /// State the run moved to.
    pub to: CandidateState,
    /// When the transition was recorded.
    pub at: OffsetDateTime,
    /// Optional human-readable note (e.g. a block/fail reason).
    pub note: Option<String>,
}

// ============================================================================
// SECTION: Hypothesis lock
// ============================================================================

/// Data captured immutably at the `hypothesis_locked` transition.
///
/// # Invariants
/// - Fields never change for the remainder of the run once locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisLock {
    /// Inclusive start of the in-sample window.
    pub in_sample_start: time::Date,
    /// Inclusive end of the in-sample window.
    pub in_sample_end: time::Date,
    /// Inclusive start of the out-of-sample window.
    pub out_of_sample_start: time::Date,
    /// Inclusive end of the out-of-sample window.
    pub out_of_sample_end: time::Date,
    /// Declared data requirement identifiers.
    pub data_requirements: Vec<String>,
    /// Algorithm parameter bag, opaque to the core.
    pub parameters: Value,
}

// ============================================================================
// SECTION: Sanity flags
// ============================================================================

/// Severity of a sanity flag raised against a stage's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitySeverity {
    /// Informational; does not affect the determination.
    Low,
    /// Worth surfacing, but does not downgrade the determination alone.
    Medium,
    /// Downgrades an otherwise-validated result to conditional.
    High,
    /// Downgrades an otherwise-validated result to invalidated.
    Critical,
}

/// One sanity flag raised against a stage's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityFlag {
    /// Severity of the flag.
    pub severity: SanitySeverity,
    /// State the flag was raised during.
    pub stage: CandidateState,
    /// Human-readable description.
    pub message: String,
}

/// Configurable thresholds for classifying a metric deviation's severity.
///
/// # Invariants
/// - `critical_sigma` is expected to exceed `high_sigma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanityThresholds {
    /// Standard-deviation distance from the cross-window mean at which a
    /// flag is `critical`.
    #[serde(default = "default_critical_sigma")]
    pub critical_sigma: f64,
    /// Standard-deviation distance at which a flag is `high`.
    #[serde(default = "default_high_sigma")]
    pub high_sigma: f64,
    /// Reported Sharpe above which a flag is `critical` regardless of
    /// deviation (implausible outperformance).
    #[serde(default = "default_critical_sharpe")]
    pub critical_sharpe: f64,
}

impl Default for SanityThresholds {
    fn default() -> Self {
        Self {
            critical_sigma: default_critical_sigma(),
            high_sigma: default_high_sigma(),
            critical_sharpe: default_critical_sharpe(),
        }
    }
}

/// Default critical-severity standard-deviation threshold.
const fn default_critical_sigma() -> f64 {
    3.0
}

/// Default high-severity standard-deviation threshold.
const fn default_high_sigma() -> f64 {
    2.0
}

/// Default critical-severity Sharpe threshold.
const fn default_critical_sharpe() -> f64 {
    5.0
}

/// Classifies a windowed metric's deviation (in standard deviations from
/// the cross-window mean) and a reported Sharpe into a [`SanitySeverity`].
#[must_use]
pub fn classify_sanity_severity(deviation_sigma: f64, reported_sharpe: f64, thresholds: SanityThresholds) -> SanitySeverity {
    if deviation_sigma.abs() > thresholds.critical_sigma || reported_sharpe > thresholds.critical_sharpe {
        return SanitySeverity::Critical;
    }
    if deviation_sigma.abs() > thresholds.high_sigma {
        return SanitySeverity::High;
    }
    SanitySeverity::Medium
}

// ============================================================================
// SECTION: Candidate run
// ============================================================================

/// A single candidate's progress through the orchestrator state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRun {
    /// Candidate identifier.
    pub candidate_id: CandidateId,
    /// Current state.
    pub state: CandidateState,
    /// Append-only transition history.
    pub history: Vec<StateRecord>,
    /// Hypothesis lock, present once `hypothesis_locked` has been entered.
    pub hypothesis_lock: Option<HypothesisLock>,
    /// Whether out-of-sample results have already been submitted.
    pub oos_submitted: bool,
    /// Accumulated sanity flags across all stages so far.
    pub sanity_flags: Vec<SanityFlag>,
}

impl CandidateRun {
    /// Starts a new run for `candidate_id` in the `initialized` state.
    #[must_use]
    pub const fn new(candidate_id: CandidateId) -> Self {
        Self {
            candidate_id,
            state: CandidateState::Initialized,
            history: Vec::new(),
            hypothesis_lock: None,
            oos_submitted: false,
            sanity_flags: Vec::new(),
        }
    }

    /// Moves the run to `to`, recording the transition at `at`.
    ///
    /// Legal moves are exactly the next state on the forward path, or
    /// `blocked`/`failed` from any non-terminal state.
    pub fn transition(&mut self, to: CandidateState, at: OffsetDateTime, note: Option<String>) -> Result<(), CoreError> {
        let legal = self.state.next_on_forward_path() == Some(to)
            || (!self.state.is_terminal() && matches!(to, CandidateState::Blocked | CandidateState::Failed));
        if !legal {
            return Err(CoreError::InvalidTransition { from: self.state, to });
        }
        self.history.push(StateRecord { from: self.state, to, at, note });
        self.state = to;
        Ok(())
    }

    /// Captures the hypothesis lock. Call only while transitioning into
    /// `hypothesis_locked`; later calls do not erase an existing lock.
    pub fn lock_hypothesis(&mut self, lock: HypothesisLock) {
        if self.hypothesis_lock.is_none() {
            self.hypothesis_lock = Some(lock);
        }
    }

    /// Verifies that `parameters` matches the locked hypothesis's
    /// parameter bag exactly.
    pub fn verify_locked_parameters(&self, parameters: &Value) -> Result<(), CoreError> {
        let lock = self.hypothesis_lock.as_ref().ok_or(CoreError::HypothesisNotLocked)?;
        if &lock.parameters != parameters {
            return Err(CoreError::HypothesisMismatch("algorithm parameters changed after lock-in".to_string()));
        }
        Ok(())
    }

    /// Records one out-of-sample submission. Fails if results were already
    /// submitted for this run; the run's recorded state is left untouched.
    pub fn submit_oos_results(&mut self) -> Result<(), CoreError> {
        if self.oos_submitted {
            return Err(CoreError::OosAlreadySubmitted);
        }
        self.oos_submitted = true;
        Ok(())
    }

    /// Appends a sanity flag to this run's accumulated list.
    pub fn raise_sanity_flag(&mut self, flag: SanityFlag) {
        self.sanity_flags.push(flag);
    }

    /// Returns the highest severity among accumulated sanity flags, if any.
    #[must_use]
    pub fn highest_sanity_severity(&self) -> Option<SanitySeverity> {
        self.sanity_flags.iter().map(|flag| flag.severity).max()
    }

    /// Computes the final determination per the orchestrator's decision
    /// tree, given the walk-forward's own verdict and the gate evaluator's
    /// report (when the walk-forward reached one).
    #[must_use]
    pub fn determine(&self, walk_forward: &WalkForward, gate_report: Option<&GateReport>) -> Determination {
        if walk_forward.determination == Determination::Blocked {
            return Determination::Blocked;
        }
        if walk_forward.determination == Determination::RetryLater {
            return Determination::RetryLater;
        }

        let Some(gate_report) = gate_report else {
            return Determination::Pending;
        };
        let Some(aggregate) = walk_forward.aggregate.as_ref() else {
            return Determination::Invalidated;
        };

        let significance_passed =
            gate_report.results.iter().find(|r| r.name == validator_gate::GateName::Significance).is_some_and(|r| r.passed);
        let has_critical_flag = self.highest_sanity_severity() == Some(SanitySeverity::Critical);
        let has_noncritical_flag = !self.sanity_flags.is_empty() && !has_critical_flag;

        if !gate_report.all_passed || has_critical_flag || !significance_passed {
            return Determination::Invalidated;
        }
        if !aggregate.regime_consistent || has_noncritical_flag {
            return Determination::Conditional;
        }
        Determination::Validated
    }
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
    use time::macros::date;
    use time::macros::datetime;
    use validator_driver::WindowMetrics;
    use validator_driver::WindowOutcome;
    use validator_gate::GateBundle;
    use validator_gate::evaluate_gates;
    use validator_gate::run_aggregate;
    use validator_ids::WindowId;

    use super::*;

    fn candidate() -> CandidateRun {
        CandidateRun::new(CandidateId::new("alpha-001"))
    }

    fn at() -> OffsetDateTime {
        datetime!(2026-01-01 00:00:00 UTC)
    }

    fn advance_to(run: &mut CandidateRun, target: CandidateState) {
        for state in FORWARD_PATH.iter().skip(1) {
            if run.state == target {
                break;
            }
            run.transition(*state, at(), None).expect("legal forward move");
            if *state == target {
                break;
            }
        }
    }

    #[test]
    fn forward_path_transitions_in_order_succeed() {
        let mut run = candidate();
        advance_to(&mut run, CandidateState::Completed);
        assert_eq!(run.state, CandidateState::Completed);
        assert_eq!(run.history.len(), FORWARD_PATH.len() - 1);
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut run = candidate();
        let result = run.transition(CandidateState::DataAudit, at(), None);
        assert_eq!(result, Err(CoreError::InvalidTransition { from: CandidateState::Initialized, to: CandidateState::DataAudit }));
    }

    #[test]
    fn blocked_is_reachable_from_any_non_terminal_state() {
        let mut run = candidate();
        run.transition(CandidateState::Blocked, at(), Some("bad data".to_string())).expect("blocked is legal");
        assert_eq!(run.state, CandidateState::Blocked);
    }

    #[test]
    fn terminal_states_accept_no_further_transitions() {
        let mut run = candidate();
        run.transition(CandidateState::Failed, at(), None).expect("failed is legal");
        assert_eq!(run.transition(CandidateState::Blocked, at(), None), Err(CoreError::InvalidTransition { from: CandidateState::Failed, to: CandidateState::Blocked }));
    }

    #[test]
    fn oos_submission_is_one_shot() {
        let mut run = candidate();
        run.submit_oos_results().expect("first submission succeeds");
        assert_eq!(run.submit_oos_results(), Err(CoreError::OosAlreadySubmitted));
    }

    #[test]
    fn locked_parameters_mismatch_is_detected() {
        let mut run = candidate();
        run.lock_hypothesis(HypothesisLock {
            in_sample_start: date!(2012 - 01 - 01),
            in_sample_end: date!(2017 - 12 - 31),
            out_of_sample_start: date!(2018 - 01 - 01),
            out_of_sample_end: date!(2023 - 12 - 31),
            data_requirements: vec!["spy_prices".to_string()],
            parameters: serde_json::json!({"lookback": 20}),
        });
        let mismatch = run.verify_locked_parameters(&serde_json::json!({"lookback": 30}));
        assert!(mismatch.is_err());
        let agree = run.verify_locked_parameters(&serde_json::json!({"lookback": 20}));
        assert!(agree.is_ok());
    }

    fn successful_walk_forward() -> WalkForward {
        let metrics = WindowMetrics { sharpe: 1.5, cagr: 0.15, max_drawdown: 0.1, alpha: 0.02, net_profit: 0.15, win_rate: 0.5, total_trades: 50 };
        run_aggregate(vec![WindowOutcome::success(WindowId::new(1.try_into().expect("non-zero")), metrics)])
    }

    #[test]
    fn validated_when_everything_passes() {
        let run = candidate();
        let walk_forward = successful_walk_forward();
        let gate_report = evaluate_gates(walk_forward.aggregate.as_ref(), GateBundle::default());
        assert_eq!(run.determine(&walk_forward, Some(&gate_report)), Determination::Validated);
    }

    #[test]
    fn critical_sanity_flag_forces_invalidated() {
        let mut run = candidate();
        run.raise_sanity_flag(SanityFlag { severity: SanitySeverity::Critical, stage: CandidateState::Regime, message: "implausible sharpe".to_string() });
        let walk_forward = successful_walk_forward();
        let gate_report = evaluate_gates(walk_forward.aggregate.as_ref(), GateBundle::default());
        assert_eq!(run.determine(&walk_forward, Some(&gate_report)), Determination::Invalidated);
    }

    #[test]
    fn noncritical_sanity_flag_downgrades_to_conditional() {
        let mut run = candidate();
        run.raise_sanity_flag(SanityFlag { severity: SanitySeverity::Medium, stage: CandidateState::Regime, message: "elevated drawdown".to_string() });
        let walk_forward = successful_walk_forward();
        let gate_report = evaluate_gates(walk_forward.aggregate.as_ref(), GateBundle::default());
        assert_eq!(run.determine(&walk_forward, Some(&gate_report)), Determination::Conditional);
    }

    #[test]
    fn blocked_walk_forward_short_circuits_the_gate_report() {
        let run = candidate();
        let walk_forward = run_aggregate(vec![WindowOutcome::engine_crash(WindowId::new(1.try_into().expect("non-zero")), "crash".to_string())]);
        assert_eq!(run.determine(&walk_forward, None), Determination::Blocked);
    }

    #[test]
    fn severity_classification_honors_thresholds() {
        let thresholds = SanityThresholds::default();
        assert_eq!(classify_sanity_severity(3.5, 1.0, thresholds), SanitySeverity::Critical);
        assert_eq!(classify_sanity_severity(0.0, 6.0, thresholds), SanitySeverity::Critical);
        assert_eq!(classify_sanity_severity(2.5, 1.0, thresholds), SanitySeverity::High);
        assert_eq!(classify_sanity_severity(1.0, 1.0, thresholds), SanitySeverity::Medium);
    }
}
