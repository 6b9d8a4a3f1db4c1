// crates/validator-cli/src/pipeline.rs
// ============================================================================
// Module: Candidate Pipeline
// Description: Drives one candidate through every validation stage.
// Purpose: Tie C1-C9 together into the `verify`/`run`/`run-all` commands.
// Dependencies: validator-core, validator-data, validator-driver,
//               validator-codegen, validator-gate, validator-store,
//               validator-verify
// ============================================================================

//! ## Overview
//! [`verify_candidate`] runs only the structural pre-flight checks (C2).
//! [`run_candidate`] runs the complete pipeline: hypothesis lock-in, data
//! audit, optional verification, code generation, walk-forward backtesting
//! with first-window error correction, gate evaluation, and final
//! persistence. Every stage transition goes through the same
//! [`validator_core::CandidateRun`] every other command would see if it
//! inspected the workspace mid-run.

use std::fs;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use validator_codegen::GeneratedProgram;
use validator_codegen::GeneratorClient;
use validator_codegen::LlmOutcome;
use validator_codegen::Provenance;
use validator_codegen::generate;
use validator_codegen::llm::extract_program;
use validator_codegen::postprocess;
use validator_core::CandidateRun;
use validator_core::CandidateState;
use validator_core::Clock;
use validator_core::CoreError;
use validator_core::HypothesisLock;
use validator_core::SafeSummary;
use validator_core::SanityFlag;
use validator_core::SanitySeverity;
use validator_core::SanityThresholds;
use validator_core::classify_sanity_severity;
use validator_data::DataRegistry;
use validator_driver::CloudExecutionClient;
use validator_driver::DriverError;
use validator_driver::ExecutionClient;
use validator_driver::LocalExecutionClient;
use validator_driver::RetryPolicy;
use validator_driver::WindowOutcome;
use validator_driver::WindowSpec;
use validator_driver::run_first_window_with_correction;
use validator_driver::run_window_with_retry;
use validator_gate::Determination;
use validator_gate::WalkForward;
use validator_gate::evaluate_gates;
use validator_gate::run_aggregate;
use validator_ids::CandidateId;
use validator_ids::DataRequirementId;
use validator_store::BacktestConfig;
use validator_store::Config;
use validator_store::ExecutionMode;
use validator_store::StoreAdapter;
use validator_store::StoreError;
use validator_verify::CandidateDocument;
use validator_verify::CandidateStatus;
use validator_verify::Verification;
use validator_verify::VerificationStatus;
use validator_verify::verify;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures that abort a command before it can report a candidate-level
/// outcome. A candidate reaching `BLOCKED`, `INVALIDATED`, or
/// `RETRY_LATER` is not one of these; those are ordinary outcomes carried
/// in the returned [`SafeSummary`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The candidate store could not complete a read or write.
    #[error("candidate store error: {0}")]
    Store(#[from] StoreError),
    /// The orchestrator state machine rejected a transition.
    #[error("orchestrator state error: {0}")]
    Core(#[from] CoreError),
    /// The backtest driver failed below the level the classifier understands.
    #[error("backtest driver error: {0}")]
    Driver(#[from] DriverError),
    /// Cloud execution mode's credentials file could not be read.
    #[error("failed to read cloud credentials at {path}: {source}")]
    Credentials {
        /// Path that could not be read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SECTION: Flags
// ============================================================================

/// Behavior-modifying flags shared by `verify`, `run`, and `run-all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    /// Generate and, where applicable, back-test, but never move the
    /// candidate document or write its persisted artifacts.
    pub dry_run: bool,
    /// Re-run a candidate that already carries a non-pending status,
    /// clearing its embedded status back to pending first.
    pub force: bool,
    /// Skip the C2 structural verification stage.
    pub skip_verify: bool,
    /// Always use the language-model generation path, bypassing template
    /// selection entirely.
    pub force_llm: bool,
}

// ============================================================================
// SECTION: Execution client construction
// ============================================================================

/// Builds the execution client `backtest` configures.
///
/// # Errors
///
/// Returns [`PipelineError::Credentials`] when cloud mode is configured and
/// its credentials file cannot be read.
pub fn build_execution_client(backtest: &BacktestConfig) -> Result<Box<dyn ExecutionClient>, PipelineError> {
    match backtest.execution_mode {
        ExecutionMode::Local => Ok(Box::new(LocalExecutionClient {
            engine_binary: backtest.engine_binary.clone(),
            timeout: Duration::from_secs(backtest.timeout_secs),
        })),
        ExecutionMode::Cloud => {
            let token = read_credentials(&backtest.credentials_path)?;
            Ok(Box::new(CloudExecutionClient::new(
                backtest.cli_binary.clone(),
                backtest.api_base_url.clone(),
                token,
                backtest.user_id.clone(),
                backtest.project_dir_strategy,
                Duration::from_secs(backtest.poll_interval_secs),
                Duration::from_secs(backtest.timeout_secs),
            )))
        }
    }
}

/// Reads and trims the cloud credentials file at `path`.
fn read_credentials(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path)
        .map(|raw| raw.trim().to_string())
        .map_err(|source| PipelineError::Credentials { path: path.to_path_buf(), source })
}

// ============================================================================
// SECTION: verify
// ============================================================================

/// Runs only the structural pre-flight checks (C2) against a candidate,
/// without mutating its lifecycle state.
///
/// # Errors
///
/// Returns [`PipelineError::Store`] if the candidate cannot be loaded.
pub fn verify_candidate(store: &StoreAdapter, id: &CandidateId) -> Result<Verification, PipelineError> {
    let candidate = store.load_candidate(id)?;
    Ok(verify(&candidate))
}

// ============================================================================
// SECTION: run
// ============================================================================

/// Runs the complete validation pipeline for one candidate.
///
/// # Errors
///
/// Returns [`PipelineError`] only for failures that prevent the command
/// from completing at all (store I/O, an illegal state transition, or a
/// fatal driver error). A candidate ending up `BLOCKED`, `INVALIDATED`, or
/// `RETRY_LATER` is reported as `Ok`.
#[expect(clippy::too_many_lines, reason = "the full pipeline sequence reads as one linear procedure, mirroring the orchestrator's own forward path")]
pub fn run_candidate(
    store: &StoreAdapter,
    config: &Config,
    clock: &dyn Clock,
    generator: &dyn GeneratorClient,
    execution: &dyn ExecutionClient,
    id: &CandidateId,
    flags: RunFlags,
) -> Result<SafeSummary, PipelineError> {
    let candidate = store.load_candidate(id)?;

    if candidate.status != CandidateStatus::Pending {
        if !flags.force {
            return Ok(already_decided_summary(id, candidate.status));
        }
        store.move_candidate(id, CandidateStatus::Pending)?;
    }

    let mut run = CandidateRun::new(id.clone());
    let now = clock.now();

    run.transition(CandidateState::HypothesisLocked, now, None)?;
    let windows = config.window_schedule.windows();
    run.lock_hypothesis(hypothesis_lock(&candidate, &windows));

    run.transition(CandidateState::DataAudit, now, None)?;
    if let Some(reason) = unmet_data_requirement(&candidate) {
        return block(store, &mut run, id, now, reason);
    }

    let verification = if flags.skip_verify { None } else { Some(verify(&candidate)) };
    if let Some(verification) = &verification {
        if verification.overall_status == VerificationStatus::Fail {
            return block(store, &mut run, id, now, verification_failure_reason(verification));
        }
    }
    let reminders: Vec<&str> = verification
        .as_ref()
        .map(|verification| verification.tests.iter().filter(|test| test.status == VerificationStatus::Warn).map(|test| test.message.as_str()).collect())
        .unwrap_or_default();

    run.transition(CandidateState::IsTesting, now, None)?;
    let generated_at = format_timestamp(now);
    let generated = match generate_program(&candidate, &generated_at, generator, &reminders, flags.force_llm) {
        Ok(generated) => generated,
        Err(reason) => return block(store, &mut run, id, now, reason),
    };

    if flags.dry_run {
        let mut summary = SafeSummary::new(id.clone(), CandidateState::IsTesting);
        summary.message = Some("dry run: stopped before backtest execution".to_string());
        return Ok(summary);
    }

    let Some(first_window) = windows.first() else {
        return block(store, &mut run, id, now, "window schedule produced no windows".to_string());
    };

    let retry_policy = RetryPolicy::new(validator_driver::driver::DEFAULT_RATE_LIMIT_ATTEMPTS);
    let correction = run_first_window_with_correction(
        execution,
        generator,
        &candidate,
        &generated.program,
        first_window,
        retry_policy,
        validator_driver::correction::DEFAULT_MAX_CORRECTION_ATTEMPTS,
        |delay| std::thread::sleep(delay),
    );
    let program = correction.program;
    let mut outcomes = vec![correction.outcome];

    for window in windows.iter().skip(1) {
        if outcomes.last().is_some_and(|outcome| outcome.engine_crash || outcome.rate_limited) {
            break;
        }
        outcomes.push(run_window_with_retry(execution, &program, window, retry_policy, |delay| std::thread::sleep(delay))?);
    }

    let walk_forward = run_aggregate(outcomes);

    match walk_forward.determination {
        Determination::RetryLater => {
            store.write_run_result(id, &walk_forward)?;
            let mut summary = SafeSummary::new(id.clone(), run.state);
            summary.determination = Some(Determination::RetryLater);
            summary.message = walk_forward.reason.clone();
            return Ok(summary);
        }
        Determination::Blocked => {
            store.write_run_result(id, &walk_forward)?;
            let reason = walk_forward.reason.clone().unwrap_or_else(|| "walk-forward blocked".to_string());
            return block(store, &mut run, id, now, reason);
        }
        _ => {}
    }

    run.transition(CandidateState::Statistical, now, None)?;
    run.transition(CandidateState::Regime, now, None)?;
    raise_sanity_flags(&mut run, &walk_forward, config.sanity_thresholds);

    run.transition(CandidateState::OosTesting, now, None)?;
    run.submit_oos_results()?;

    run.transition(CandidateState::Determination, now, None)?;
    let gate_report = evaluate_gates(walk_forward.aggregate.as_ref(), config.gates);
    let determination = run.determine(&walk_forward, Some(&gate_report));

    run.transition(CandidateState::Completed, now, None)?;

    store.write_backtest_program(id, &program)?;
    store.write_last_output(id, &outcome_text(walk_forward.outcomes.last()))?;
    store.write_run_result(id, &walk_forward)?;
    store.write_gate_report(id, &gate_report)?;

    let mut summary = SafeSummary::new(id.clone(), CandidateState::Completed);
    summary.determination = Some(determination);
    summary.sanity_flag_severities = sorted_severities(&run);
    store.write_determination(id, &summary)?;

    let mapped_status = if determination == Determination::Validated { CandidateStatus::Validated } else { CandidateStatus::Invalidated };
    store.move_candidate(id, mapped_status)?;

    Ok(summary)
}

// ============================================================================
// SECTION: Stage helpers
// ============================================================================

/// Builds the summary returned when a non-forced re-run is skipped because
/// the candidate already carries a decision.
fn already_decided_summary(id: &CandidateId, status: CandidateStatus) -> SafeSummary {
    let mut summary = SafeSummary::new(id.clone(), CandidateState::Completed);
    summary.message = Some(format!("candidate already {}; pass --force to re-run", status.directory_name()));
    summary
}

/// Transitions `run` to `Blocked`, persists the resulting summary, and
/// moves the candidate document into the blocked directory.
fn block(store: &StoreAdapter, run: &mut CandidateRun, id: &CandidateId, at: time::OffsetDateTime, reason: String) -> Result<SafeSummary, PipelineError> {
    run.transition(CandidateState::Blocked, at, Some(reason.clone()))?;
    let mut summary = SafeSummary::new(id.clone(), CandidateState::Blocked);
    summary.message = Some(reason);
    store.write_determination(id, &summary)?;
    store.move_candidate(id, CandidateStatus::Blocked)?;
    Ok(summary)
}

/// Builds the hypothesis lock captured when entering `HypothesisLocked`.
fn hypothesis_lock(candidate: &CandidateDocument, windows: &[WindowSpec]) -> HypothesisLock {
    let data_requirements = candidate.data_requirements.as_ref().map(|requirements| requirements.primary.clone()).unwrap_or_default();
    let (in_sample_start, in_sample_end, out_of_sample_start, out_of_sample_end) = window_split(windows);
    HypothesisLock {
        in_sample_start,
        in_sample_end,
        out_of_sample_start,
        out_of_sample_end,
        data_requirements,
        parameters: candidate.parameters.clone(),
    }
}

/// Splits a window schedule into an in-sample span (every window but the
/// last) and an out-of-sample span (the last window alone).
///
/// Panics if `windows` is empty; every `WindowSchedule` variant yields at
/// least one window.
fn window_split(windows: &[WindowSpec]) -> (time::Date, time::Date, time::Date, time::Date) {
    let last = windows.len() - 1;
    if last == 0 {
        (windows[0].start, windows[0].end, windows[0].start, windows[0].end)
    } else {
        (windows[0].start, windows[last - 1].end, windows[last].start, windows[last].end)
    }
}

/// Resolves every declared data requirement and returns a reason string
/// for the first one found unavailable, if any.
fn unmet_data_requirement(candidate: &CandidateDocument) -> Option<String> {
    let requirement_ids: Vec<DataRequirementId> = candidate
        .data_requirements
        .as_ref()
        .map(|requirements| requirements.primary.iter().map(|id| DataRequirementId::new(id.as_str())).collect())
        .unwrap_or_default();
    let registry = DataRegistry::new();
    let (missing_id, verdict) = registry.check_availability(&requirement_ids).into_iter().find(|(_, verdict)| !verdict.available)?;
    let notes = verdict.notes.unwrap_or_else(|| "no further detail".to_string());
    Some(format!("data requirement unavailable: {missing_id} ({notes})"))
}

/// Builds the block reason from a failed verification's failing checks.
fn verification_failure_reason(verification: &Verification) -> String {
    let failures: Vec<&str> =
        verification.tests.iter().filter(|test| test.status == VerificationStatus::Fail).map(|test| test.message.as_str()).collect();
    format!("verification failed: {}", failures.join("; "))
}

/// Generates a program for `candidate`, honoring `force_llm` by bypassing
/// template selection and calling the generator directly.
fn generate_program(
    candidate: &CandidateDocument,
    generated_at: &str,
    generator: &dyn GeneratorClient,
    reminders: &[&str],
    force_llm: bool,
) -> Result<GeneratedProgram, String> {
    if force_llm {
        return match generator.generate(candidate, reminders) {
            Ok(LlmOutcome::Reply(reply)) => extract_program(&reply)
                .map(|program| GeneratedProgram { program: postprocess(&program), provenance: Provenance::Llm })
                .ok_or_else(|| "language-model reply could not be interpreted as a program".to_string()),
            Ok(LlmOutcome::Offline) => Err("language-model client is offline".to_string()),
            Err(transport_error) => Err(transport_error),
        };
    }
    generate(candidate, generated_at.to_string(), generator, reminders).map_err(|error| error.to_string())
}

/// Formats a clock reading as an RFC 3339 timestamp for embedding in
/// generated programs.
fn format_timestamp(at: time::OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| "unknown-generation-time".to_string())
}

/// Raises a sanity flag against windows whose CAGR deviates far enough
/// from the cross-window mean to be `High` or `Critical` severity;
/// `Medium` is the non-notable floor and is never flagged.
fn raise_sanity_flags(run: &mut CandidateRun, walk_forward: &WalkForward, thresholds: SanityThresholds) {
    let cagrs: Vec<f64> = walk_forward.outcomes.iter().filter(|outcome| outcome.success).filter_map(|outcome| outcome.metrics.map(|metrics| metrics.cagr)).collect();
    if cagrs.len() < 2 {
        return;
    }
    let mean = cagrs.iter().sum::<f64>() / cagrs.len() as f64;
    let variance = cagrs.iter().map(|cagr| (cagr - mean).powi(2)).sum::<f64>() / cagrs.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return;
    }
    for outcome in &walk_forward.outcomes {
        let Some(metrics) = outcome.metrics else { continue };
        let deviation = (metrics.cagr - mean) / std_dev;
        let severity = classify_sanity_severity(deviation, metrics.sharpe, thresholds);
        if matches!(severity, SanitySeverity::High | SanitySeverity::Critical) {
            run.raise_sanity_flag(SanityFlag {
                severity,
                stage: CandidateState::Regime,
                message: format!("window {} CAGR deviates {deviation:.2} sigma from the cross-window mean", outcome.window),
            });
        }
    }
}

/// Returns accumulated sanity-flag severities, most severe first.
fn sorted_severities(run: &CandidateRun) -> Vec<SanitySeverity> {
    let mut severities: Vec<SanitySeverity> = run.sanity_flags.iter().map(|flag| flag.severity).collect();
    severities.sort_by(|left, right| right.cmp(left));
    severities
}

/// Derives the text written to `last_output.txt` from the final window
/// outcome. The driver does not thread raw engine output out past
/// `WindowOutcome`, so this is descriptive rather than a literal capture.
fn outcome_text(outcome: Option<&WindowOutcome>) -> String {
    match outcome {
        Some(outcome) if outcome.success => "backtest completed successfully".to_string(),
        Some(outcome) => outcome.reason.clone().unwrap_or_else(|| "backtest failed with no recorded reason".to_string()),
        None => "no backtest windows were run".to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
