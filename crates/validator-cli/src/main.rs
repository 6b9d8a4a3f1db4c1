// crates/validator-cli/src/main.rs
// ============================================================================
// Module: Validator CLI Entry Point
// Description: Command dispatcher for candidate verification and validation runs.
// Purpose: Drive candidates through the pipeline from the command line.
// Dependencies: clap, validator-core, validator-store, validator-driver,
//               validator-codegen, validator-data, validator-verify, tokio.
// ============================================================================

//! ## Overview
//! Three subcommands cover the candidate lifecycle: `verify` runs the cheap
//! structural pre-flight checks alone, `run` drives one candidate through
//! the full pipeline, and `run-all` sweeps every pending candidate. All
//! three share the same workspace, configuration, and execution client
//! construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use validator_cli::logging;
use validator_cli::offline::OfflineGeneratorClient;
use validator_cli::pipeline;
use validator_cli::pipeline::PipelineError;
use validator_cli::pipeline::RunFlags;
use validator_cli::report::write_stderr_line;
use validator_cli::report::write_stdout_line;
use validator_core::SystemClock;
use validator_ids::CandidateId;
use validator_store::Config;
use validator_store::StoreAdapter;
use validator_store::WorkspaceLayout;
use validator_verify::CandidateStatus;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "validate", disable_help_subcommand = true)]
struct Cli {
    /// Workspace root holding `strategies/`, `validations/`, and `config.toml`.
    #[arg(long, value_name = "DIR", global = true, default_value = ".")]
    workspace: PathBuf,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the structural pre-flight checks against one pending candidate.
    Verify {
        /// Candidate identifier.
        id: String,
    },
    /// Runs the full validation pipeline against one candidate.
    Run {
        /// Candidate identifier.
        id: String,
        #[command(flatten)]
        flags: RunFlagsArgs,
    },
    /// Runs the full validation pipeline against every pending candidate.
    RunAll {
        #[command(flatten)]
        flags: RunFlagsArgs,
    },
}

/// Shared flags for `run` and `run-all`.
#[derive(clap::Args, Debug, Clone, Copy)]
struct RunFlagsArgs {
    /// Generate and, where applicable, back-test, but never move the
    /// candidate document or write its persisted artifacts.
    #[arg(long)]
    dry_run: bool,
    /// Re-run a candidate that already carries a non-pending status.
    #[arg(long)]
    force: bool,
    /// Skip the structural verification stage.
    #[arg(long)]
    skip_verify: bool,
    /// Always use the language-model generation path.
    #[arg(long)]
    force_llm: bool,
}

impl From<RunFlagsArgs> for RunFlags {
    fn from(args: RunFlagsArgs) -> Self {
        Self { dry_run: args.dry_run, force: args.force, skip_verify: args.skip_verify, force_llm: args.force_llm }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for command-level failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self { message }
    }
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        Self::new(error.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    logging::init_logging();
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let layout = WorkspaceLayout::new(cli.workspace.clone());
    let store = StoreAdapter::new(layout.clone()).map_err(|err| CliError::new(format!("failed to initialize workspace: {err}")))?;
    let config = load_config(&layout)?;

    match cli.command {
        Commands::Verify { id } => command_verify(&store, &id),
        Commands::Run { id, flags } => command_run(&store, &config, &id, flags.into()),
        Commands::RunAll { flags } => command_run_all(&store, &config, flags.into()),
    }
}

/// Loads `config.toml` from the workspace root, falling back to defaults
/// when the file does not exist.
fn load_config(layout: &WorkspaceLayout) -> CliResult<Config> {
    let path = layout.config_path();
    if path.exists() {
        Config::load(&path).map_err(|err| CliError::new(format!("failed to load configuration: {err}")))
    } else {
        Ok(Config::default())
    }
}

// ============================================================================
// SECTION: Verify Command
// ============================================================================

/// Executes the `verify` command.
fn command_verify(store: &StoreAdapter, id: &str) -> CliResult<ExitCode> {
    let candidate_id = CandidateId::new(id);
    let verification = pipeline::verify_candidate(store, &candidate_id)?;

    write_stdout_line(&format!("candidate {candidate_id}: {}", verification_status_label(verification.overall_status)))
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    for test in &verification.tests {
        write_stdout_line(&format!("  [{}] {}: {}", verification_status_label(test.status), test.name, test.message))
            .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    }

    if verification.failed() > 0 { Ok(ExitCode::FAILURE) } else { Ok(ExitCode::SUCCESS) }
}

/// Renders a verification status as the same snake-case text its serde
/// form uses.
const fn verification_status_label(status: validator_verify::VerificationStatus) -> &'static str {
    match status {
        validator_verify::VerificationStatus::Fail => "fail",
        validator_verify::VerificationStatus::Warn => "warn",
        validator_verify::VerificationStatus::Pass => "pass",
        validator_verify::VerificationStatus::Skip => "skip",
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command for a single candidate.
fn command_run(store: &StoreAdapter, config: &Config, id: &str, flags: RunFlags) -> CliResult<ExitCode> {
    let candidate_id = CandidateId::new(id);
    let clock = SystemClock;
    let generator = OfflineGeneratorClient;
    let execution = pipeline::build_execution_client(&config.backtest)?;

    let summary = pipeline::run_candidate(store, config, &clock, &generator, execution.as_ref(), &candidate_id, flags)?;
    report_summary(&summary)
}

/// Executes the `run-all` command against every pending candidate.
fn command_run_all(store: &StoreAdapter, config: &Config, flags: RunFlags) -> CliResult<ExitCode> {
    let pending = store.list_candidates_in(CandidateStatus::Pending).map_err(|err| CliError::new(format!("failed to list pending candidates: {err}")))?;
    let clock = SystemClock;
    let generator = OfflineGeneratorClient;
    let execution = pipeline::build_execution_client(&config.backtest)?;

    let mut any_failed = false;
    for candidate_id in &pending {
        let summary = pipeline::run_candidate(store, config, &clock, &generator, execution.as_ref(), candidate_id, flags)?;
        if report_summary(&summary)? == ExitCode::FAILURE {
            any_failed = true;
        }
    }
    if any_failed { Ok(ExitCode::FAILURE) } else { Ok(ExitCode::SUCCESS) }
}

/// Writes one summary line to stdout and classifies its exit code.
fn report_summary(summary: &validator_core::SafeSummary) -> CliResult<ExitCode> {
    let determination_text = summary.determination.map_or("pending", determination_label);
    let message_text = summary.message.clone().unwrap_or_default();
    write_stdout_line(&format!("candidate {}: {determination_text} {message_text}", summary.candidate_id))
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    match summary.determination {
        Some(validator_gate::Determination::Validated | validator_gate::Determination::Conditional) | None => Ok(ExitCode::SUCCESS),
        Some(_) => Ok(ExitCode::FAILURE),
    }
}

/// Renders a determination as the same snake-case text its serde form uses.
const fn determination_label(determination: validator_gate::Determination) -> &'static str {
    match determination {
        validator_gate::Determination::Validated => "validated",
        validator_gate::Determination::Invalidated => "invalidated",
        validator_gate::Determination::Conditional => "conditional",
        validator_gate::Determination::Blocked => "blocked",
        validator_gate::Determination::RetryLater => "retry_later",
        validator_gate::Determination::Pending => "pending",
        validator_gate::Determination::Failed => "failed",
    }
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
