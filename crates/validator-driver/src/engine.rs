// crates/validator-driver/src/engine.rs
// ============================================================================
// Module: Execution Client
// Description: Local subprocess and cloud execution modes for C4.
// Purpose: Abstract "run this program over this window" behind one trait.
// Dependencies: crate::window, reqwest, sha2, base64, std::process
// ============================================================================

//! ## Overview
//! [`ExecutionClient`] is the seam between the driver's classification and
//! retry logic and the two concrete ways a backtest actually runs. The
//! local mode spawns the engine as a subprocess; the cloud mode pushes the
//! project through the engine's client tool and polls a remote API for
//! status. Two cloud-only directory strategies ([`ProjectDirStrategy`])
//! share behavior and differ only in whether the project directory is
//! reused across runs.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;

use crate::window::WindowSpec;

// ============================================================================
// SECTION: Shared types
// ============================================================================

/// Raw result of one execution attempt, before classification.
#[derive(Debug, Clone)]
pub struct RawResult {
    /// Process exit code, or a synthesized nonzero code on timeout.
    pub exit_code: i32,
    /// Combined stdout+stderr (local) or remote log text (cloud).
    pub combined_output: String,
    /// Structured statistics, when the remote API returned them.
    pub statistics: Option<HashMap<String, String>>,
}

/// Fatal failures that prevent an execution attempt from producing any
/// classifiable result at all.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The engine subprocess could not be spawned or its output read.
    #[error("failed to run engine subprocess: {0}")]
    Io(String),
    /// A remote API call failed at the transport level.
    #[error("remote engine API call failed: {0}")]
    RemoteApi(String),
    /// The project directory could not be prepared.
    #[error("failed to prepare project directory: {0}")]
    ProjectSetup(String),
}

/// Capability interface the driver depends on to actually run a program.
pub trait ExecutionClient {
    /// Executes `program` over `window`, returning a raw, unclassified
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] only for failures below the level the
    /// classifier understands (the process could not even be started).
    fn execute(&self, program: &str, window: &WindowSpec) -> Result<RawResult, DriverError>;
}

// ============================================================================
// SECTION: Local execution
// ============================================================================

/// Runs the engine as a local subprocess in a project directory.
#[derive(Debug, Clone)]
pub struct LocalExecutionClient {
    /// Path to the engine's local launcher binary.
    pub engine_binary: PathBuf,
    /// Wall-clock budget for one backtest.
    pub timeout: Duration,
}

impl ExecutionClient for LocalExecutionClient {
    fn execute(&self, program: &str, _window: &WindowSpec) -> Result<RawResult, DriverError> {
        let project_dir = tempfile::tempdir().map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
        write_project_files(project_dir.path(), program)?;

        let mut child = Command::new(&self.engine_binary)
            .arg("backtest")
            .arg(project_dir.path())
            .current_dir(project_dir.path())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|err| DriverError::Io(err.to_string()))?;

        let deadline = Instant::now() + self.timeout;
        let exit_status = loop {
            if let Some(status) = child.try_wait().map_err(|err| DriverError::Io(err.to_string()))? {
                break Some(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            std::thread::sleep(Duration::from_millis(200));
        };

        let output = child.wait_with_output().map_err(|err| DriverError::Io(err.to_string()))?;
        let combined_output = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        let exit_code = match exit_status {
            Some(status) => status.code().unwrap_or(-1),
            None => -1,
        };

        Ok(RawResult { exit_code, combined_output, statistics: None })
    }
}

/// Writes the algorithm source and a minimal config file into a project directory.
fn write_project_files(project_dir: &Path, program: &str) -> Result<(), DriverError> {
    let main_path = project_dir.join("main.py");
    let mut main_file = std::fs::File::create(&main_path).map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
    main_file
        .write_all(program.as_bytes())
        .map_err(|err| DriverError::ProjectSetup(err.to_string()))?;

    let config_path = project_dir.join("config.json");
    let mut config_file =
        std::fs::File::create(&config_path).map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
    config_file
        .write_all(b"{\"algorithm-type-name\": \"main\"}")
        .map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Cloud execution
// ============================================================================

/// Whether the cloud client reuses one project directory across runs (to
/// avoid an external per-day project-creation quota) or creates a fresh
/// one per run. Behavior is otherwise identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectDirStrategy {
    /// Reuse a single named remote project across runs.
    #[default]
    Reuse,
    /// Create a fresh remote project for every run.
    Fresh,
}

/// Runs the engine's cloud backtest: push via the client tool, then poll
/// the remote API for status.
#[derive(Debug, Clone)]
pub struct CloudExecutionClient {
    /// Path to the engine's cloud-aware client tool.
    pub cli_binary: PathBuf,
    /// Base URL of the remote engine API.
    pub api_base_url: String,
    /// API token used to build the auth header.
    pub token: String,
    /// User id embedded in the auth header.
    pub user_id: String,
    /// Project directory reuse strategy.
    pub project_dir_strategy: ProjectDirStrategy,
    /// Poll interval while waiting for a backtest to finish.
    pub poll_interval: Duration,
    /// Wall-clock budget for one backtest, including polling.
    pub timeout: Duration,
    /// Shared blocking HTTP client.
    http: reqwest::blocking::Client,
}

impl CloudExecutionClient {
    /// Builds a cloud execution client.
    #[must_use]
    pub fn new(
        cli_binary: PathBuf,
        api_base_url: String,
        token: String,
        user_id: String,
        project_dir_strategy: ProjectDirStrategy,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            cli_binary,
            api_base_url,
            token,
            user_id,
            project_dir_strategy,
            poll_interval,
            timeout,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Resolves the project directory to use under `scratch`, per `project_dir_strategy`.
    fn project_dir(&self, scratch: &Path) -> PathBuf {
        match self.project_dir_strategy {
            ProjectDirStrategy::Reuse => scratch.join("validator-shared-project"),
            ProjectDirStrategy::Fresh => scratch.join(format!("run-{}", uuid_like_suffix())),
        }
    }

    /// Pushes a project to the cloud via the client tool, returning its ids.
    fn push(&self, program: &str, scratch: &Path) -> Result<(String, String), DriverError> {
        let project_dir = self.project_dir(scratch);
        std::fs::create_dir_all(&project_dir).map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
        write_project_files(&project_dir, program)?;

        let output = Command::new(&self.cli_binary)
            .arg("cloud")
            .arg("push")
            .arg(&project_dir)
            .output()
            .map_err(|err| DriverError::Io(err.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        extract_ids(&stdout).ok_or_else(|| DriverError::Io("push output did not contain project/backtest ids".to_string()))
    }

    /// Polls the remote API until the backtest completes, errors, or times out.
    fn poll_status(&self, project_id: &str, backtest_id: &str) -> Result<RawResult, DriverError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let response = self
                .http
                .get(format!("{}/backtests/read", self.api_base_url))
                .header("Authorization", self.auth_header())
                .query(&[("projectId", project_id), ("backtestId", backtest_id)])
                .send()
                .map_err(|err| DriverError::RemoteApi(err.to_string()))?;
            let body: serde_json::Value = response.json().map_err(|err| DriverError::RemoteApi(err.to_string()))?;

            let status = body.get("status").and_then(serde_json::Value::as_str).unwrap_or("");
            match status {
                "Completed" => {
                    return Ok(RawResult {
                        exit_code: 0,
                        combined_output: body.to_string(),
                        statistics: extract_statistics(&body),
                    });
                }
                "RuntimeError" => {
                    return Ok(RawResult {
                        exit_code: 1,
                        combined_output: body.to_string(),
                        statistics: None,
                    });
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                let _ = self.delete_backtest(project_id, backtest_id);
                return Ok(RawResult {
                    exit_code: 1,
                    combined_output: "backtest timed out while polling remote status".to_string(),
                    statistics: None,
                });
            }
            tracing::info!(project_id, backtest_id, "waiting on remote backtest");
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Cancels a remote backtest. Used both for local timeouts and for
    /// rate-limit cleanup of orphaned runs.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::RemoteApi`] on transport failure.
    pub fn delete_backtest(&self, project_id: &str, backtest_id: &str) -> Result<(), DriverError> {
        self.http
            .post(format!("{}/backtests/delete", self.api_base_url))
            .header("Authorization", self.auth_header())
            .query(&[("projectId", project_id), ("backtestId", backtest_id)])
            .send()
            .map_err(|err| DriverError::RemoteApi(err.to_string()))?;
        Ok(())
    }

    /// Builds this client's current auth header.
    fn auth_header(&self) -> String {
        build_auth_header(&self.token, current_unix_timestamp(), &self.user_id)
    }
}

impl ExecutionClient for CloudExecutionClient {
    fn execute(&self, program: &str, _window: &WindowSpec) -> Result<RawResult, DriverError> {
        let scratch = tempfile::tempdir().map_err(|err| DriverError::ProjectSetup(err.to_string()))?;
        let (project_id, backtest_id) = self.push(program, scratch.path())?;
        self.poll_status(&project_id, &backtest_id)
    }
}

// ============================================================================
// SECTION: Auth header
// ============================================================================

/// Builds the HMAC-style auth header: SHA-256 of `token:timestamp`,
/// base64-encoded, paired with the user id.
#[must_use]
pub fn build_auth_header(token: &str, timestamp: i64, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{token}:{timestamp}").as_bytes());
    let digest = hasher.finalize();
    format!("{user_id}:{}", BASE64.encode(digest))
}

/// Returns the current unix timestamp, for auth-header construction.
fn current_unix_timestamp() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Returns a unique-enough suffix for a fresh project directory name.
fn uuid_like_suffix() -> String {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{nanos:x}")
}

/// Extracts the project id and backtest id from the push tool's stdout.
fn extract_ids(push_output: &str) -> Option<(String, String)> {
    let mut project_id = None;
    let mut backtest_id = None;
    for line in push_output.lines() {
        if let Some(value) = line_value_after(line, "project id") {
            project_id = Some(value);
        }
        if let Some(value) = line_value_after(line, "backtest id") {
            backtest_id = Some(value);
        }
    }
    Some((project_id?, backtest_id?))
}

/// Returns the trimmed text after `marker` on `line`, case-insensitively.
fn line_value_after(line: &str, marker: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    let idx = lower.find(marker)?;
    let rest = &line[idx + marker.len()..];
    let value = rest.trim_start_matches([':', ' ']).trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

/// Extracts a flat statistics map from a remote API response body.
fn extract_statistics(body: &serde_json::Value) -> Option<HashMap<String, String>> {
    let map = body.get("statistics")?.as_object()?;
    Some(
        map.iter()
            .filter_map(|(key, value)| value.as_str().map(|value| (key.clone(), value.to_string())))
            .collect(),
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
    use super::*;

    #[test]
    fn auth_header_is_deterministic_for_fixed_inputs() {
        let first = build_auth_header("secret", 1_700_000_000, "user-1");
        let second = build_auth_header("secret", 1_700_000_000, "user-1");
        assert_eq!(first, second);
        assert!(first.starts_with("user-1:"));
    }

    #[test]
    fn auth_header_changes_with_timestamp() {
        let first = build_auth_header("secret", 1, "user-1");
        let second = build_auth_header("secret", 2, "user-1");
        assert_ne!(first, second);
    }

    #[test]
    fn extracts_ids_from_push_output() {
        let output = "Pushing project...\nProject id: 123\nBacktest id: 456\nDone.";
        let (project_id, backtest_id) = extract_ids(output).expect("ids present");
        assert_eq!(project_id, "123");
        assert_eq!(backtest_id, "456");
    }

    #[test]
    fn missing_ids_are_reported_as_none() {
        assert!(extract_ids("no ids here").is_none());
    }
}
