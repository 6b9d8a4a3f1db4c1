// crates/validator-cli/tests/scenarios.rs
// ============================================================================
// Module: End-to-end Scenario Tests
// Description: The six literal-input scenarios against the full pipeline.
// Purpose: Exercise C1-C9 together the way `validate run` does, catching
//          regressions a unit test scoped to one crate would miss.
// Dependencies: validator-cli, validator-core, validator-driver,
//               validator-gate, validator-store, validator-verify
// ============================================================================

//! End-to-end scenario tests for the full validation pipeline.

#![allow(clippy::unwrap_used, reason = "tests use unwrap on deterministic fixtures")]
#![allow(clippy::expect_used, reason = "tests use expect for explicit failure messages")]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;

use tempfile::tempdir;
use time::macros::datetime;
use validator_cli::offline::OfflineGeneratorClient;
use validator_cli::pipeline::RunFlags;
use validator_cli::pipeline::run_candidate;
use validator_codegen::GeneratorClient;
use validator_codegen::LlmOutcome;
use validator_core::FixedClock;
use validator_driver::DriverError;
use validator_driver::ExecutionClient;
use validator_driver::RawResult;
use validator_driver::WindowSpec;
use validator_gate::Determination;
use validator_gate::GateBundle;
use validator_gate::WindowSchedule;
use validator_ids::CandidateId;
use validator_store::Config;
use validator_store::StoreAdapter;
use validator_store::WorkspaceLayout;
use validator_verify::CandidateDocument;
use validator_verify::CandidateStatus;
use validator_verify::DataRequirements;
use validator_verify::Entry;
use validator_verify::Tags;
use validator_verify::Universe;
use validator_verify::UniverseType;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn candidate(id: &str) -> CandidateDocument {
    CandidateDocument {
        id: CandidateId::new(id),
        name: "Momentum rotation".to_string(),
        description: None,
        tags: Tags::default(),
        status: CandidateStatus::Pending,
        universe: Some(Universe {
            universe_type: Some(UniverseType::Static),
            symbols: vec!["SPY".to_string(), "TLT".to_string(), "GLD".to_string()],
            instruments: Vec::new(),
            filters: Vec::new(),
        }),
        entry: Some(Entry { entry_type: Some("relative_momentum".to_string()), signals: None, technical: None, fundamental: None }),
        exit: None,
        position: None,
        parameters: serde_json::json!({"lookback": 126}),
        data_requirements: Some(DataRequirements { primary: vec!["spy_prices".to_string()] }),
        hypothesis: None,
        strategy_type: Some("momentum_rotation".to_string()),
        signal_type: Some("relative_momentum".to_string()),
    }
}

fn workspace() -> (tempfile::TempDir, WorkspaceLayout, StoreAdapter) {
    let dir = tempdir().expect("tempdir");
    let layout = WorkspaceLayout::new(dir.path());
    let adapter = StoreAdapter::new(layout.clone()).expect("adapter");
    (dir, layout, adapter)
}

fn write_pending(layout: &WorkspaceLayout, document: &CandidateDocument) {
    let path = layout.candidate_path(CandidateStatus::Pending, &document.id, "yaml");
    fs::write(path, serde_yaml::to_string(document).expect("serialize")).expect("write");
}

fn statistics(sharpe: &str, cagr: &str, drawdown: &str, total_orders: &str) -> HashMap<String, String> {
    let mut stats = HashMap::new();
    stats.insert("Sharpe Ratio".to_string(), sharpe.to_string());
    stats.insert("Compounding Annual Return".to_string(), cagr.to_string());
    stats.insert("Drawdown".to_string(), drawdown.to_string());
    stats.insert("Alpha".to_string(), "2.0%".to_string());
    stats.insert("Net Profit".to_string(), "20.0%".to_string());
    stats.insert("Win Rate".to_string(), "55.0%".to_string());
    stats.insert("Total Orders".to_string(), total_orders.to_string());
    stats
}

/// Loose gate bundle every scenario shares unless it names its own.
fn loose_gates() -> GateBundle {
    GateBundle { min_sharpe: 0.5, min_consistency: 0.5, max_drawdown: 0.25, min_cagr: 0.05, max_p_value: 0.10 }
}

/// An execution client that returns one scripted [`RawResult`] per call, in
/// order, regardless of which window it is asked to run.
struct ScriptedClient {
    responses: RefCell<Vec<RawResult>>,
}

impl ScriptedClient {
    fn new(responses: Vec<RawResult>) -> Self {
        Self { responses: RefCell::new(responses) }
    }
}

impl ExecutionClient for ScriptedClient {
    fn execute(&self, _program: &str, _window: &WindowSpec) -> Result<RawResult, DriverError> {
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            return Ok(RawResult { exit_code: 1, combined_output: "no more scripted responses".to_string(), statistics: None });
        }
        Ok(responses.remove(0))
    }
}

fn ok(statistics: HashMap<String, String>) -> RawResult {
    RawResult { exit_code: 0, combined_output: "ok".to_string(), statistics: Some(statistics) }
}

/// A generator whose `correct` call rewrites a `self.History(` call to its
/// lowercase host-API form, matching S6's correctable failure.
struct HistoryCaseCorrector;

impl GeneratorClient for HistoryCaseCorrector {
    fn generate(&self, _candidate: &CandidateDocument, _reminders: &[&str]) -> Result<LlmOutcome, String> {
        Ok(LlmOutcome::Offline)
    }

    fn correct(&self, failing_program: &str, _error_text: &str, _candidate: &CandidateDocument) -> Result<LlmOutcome, String> {
        Ok(LlmOutcome::Reply(failing_program.replace("self.History(", "self.history(")))
    }
}

// ============================================================================
// SECTION: S1 — Happy path, template, single window
// ============================================================================

#[test]
fn s1_happy_path_single_window_validates() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-001");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::Single, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = OfflineGeneratorClient;
    let execution = ScriptedClient::new(vec![ok(statistics("1.20", "12.0%", "14.0%", "42"))]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, Some(Determination::Validated));
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Validated);
}

// ============================================================================
// SECTION: S2 — Failing Sharpe
// ============================================================================

#[test]
fn s2_failing_sharpe_invalidates() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-002");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::Single, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = OfflineGeneratorClient;
    let execution = ScriptedClient::new(vec![ok(statistics("0.30", "12.0%", "14.0%", "42"))]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, Some(Determination::Invalidated));
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Invalidated);
}

// ============================================================================
// SECTION: S3 — Rate-limited mid-walk-forward
// ============================================================================

#[test]
fn s3_rate_limited_second_window_retries_later() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-003");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::InSampleOutOfSample, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = OfflineGeneratorClient;
    let rate_limited = RawResult { exit_code: 1, combined_output: "rate limit exceeded".to_string(), statistics: None };
    let execution = ScriptedClient::new(vec![
        ok(statistics("1.20", "12.0%", "14.0%", "42")),
        rate_limited.clone(),
        rate_limited.clone(),
        rate_limited,
    ]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, Some(Determination::RetryLater));
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Pending);
}

// ============================================================================
// SECTION: S4 — Engine crash
// ============================================================================

#[test]
fn s4_engine_crash_on_first_window_blocks() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-004");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::InSampleOutOfSample, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = OfflineGeneratorClient;
    let execution = ScriptedClient::new(vec![RawResult { exit_code: 1, combined_output: "core dumped".to_string(), statistics: None }]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, None);
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Blocked);
}

// ============================================================================
// SECTION: S5 — Zero trades
// ============================================================================

#[test]
fn s5_zero_trades_blocks_with_no_successful_windows() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-005");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::Single, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = OfflineGeneratorClient;
    let execution = ScriptedClient::new(vec![ok(statistics("0.0", "0.0%", "0.0%", "0"))]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, None);
    assert_eq!(summary.message.as_deref(), Some("no successful backtest windows"));
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Blocked);
}

// ============================================================================
// SECTION: S6 — Correction loop
// ============================================================================

#[test]
fn s6_correctable_first_window_failure_recovers() {
    let (_dir, layout, adapter) = workspace();
    let document = candidate("STRAT-006");
    write_pending(&layout, &document);

    let config = Config { window_schedule: WindowSchedule::InSampleOutOfSample, gates: loose_gates(), ..Config::default() };
    let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
    let generator = HistoryCaseCorrector;
    let failing = RawResult {
        exit_code: 1,
        combined_output: "An error occurred during this backtest: AttributeError: 'QCAlgorithm' object has no attribute 'History'".to_string(),
        statistics: None,
    };
    let execution = ScriptedClient::new(vec![
        failing,
        ok(statistics("1.20", "12.0%", "14.0%", "42")),
        ok(statistics("1.10", "11.0%", "15.0%", "40")),
    ]);

    let summary = run_candidate(&adapter, &config, &clock, &generator, &execution, &document.id, RunFlags::default()).expect("pipeline runs");

    assert_eq!(summary.determination, Some(Determination::Validated));
    assert_eq!(adapter.load_candidate(&document.id).expect("reload").status, CandidateStatus::Validated);
}
