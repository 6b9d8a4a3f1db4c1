// crates/validator-store/src/config.rs
// ============================================================================
// Module: Configuration
// Description: Loads and validates the workspace's config.toml.
// Purpose: Implement the Configuration surface of the CLI-facing contract.
// Dependencies: serde, toml, validator-core, validator-gate
// ============================================================================

//! ## Overview
//! Every tunable has a `#[serde(default = "fn")]` fallback, so a config file
//! may omit anything it does not want to override. [`Config::validate`]
//! rejects out-of-range values before the orchestrator starts.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use validator_core::SanityThresholds;
use validator_driver::ProjectDirStrategy;
use validator_gate::GateBundle;
use validator_gate::WindowSchedule;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents could not be parsed as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path whose contents failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },
    /// A loaded config failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config surface
// ============================================================================

/// Backtest execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run the engine as a local subprocess.
    #[default]
    Local,
    /// Push work to the cloud engine and poll for results.
    Cloud,
}

/// Backtest execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Per-window subprocess/poll timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Execution mode.
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Path to engine credentials, used only in cloud mode.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Path to the engine's local launcher binary, used only in local mode.
    #[serde(default = "default_engine_binary")]
    pub engine_binary: PathBuf,
    /// Path to the engine's cloud-aware client tool, used only in cloud mode.
    #[serde(default = "default_cli_binary")]
    pub cli_binary: PathBuf,
    /// Base URL of the remote engine API, used only in cloud mode.
    #[serde(default)]
    pub api_base_url: String,
    /// User id embedded in the cloud auth header, used only in cloud mode.
    #[serde(default)]
    pub user_id: String,
    /// Poll interval while waiting for a cloud backtest, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Whether the cloud client reuses one project directory across runs.
    #[serde(default)]
    pub project_dir_strategy: ProjectDirStrategy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            execution_mode: ExecutionMode::default(),
            credentials_path: default_credentials_path(),
            engine_binary: default_engine_binary(),
            cli_binary: default_cli_binary(),
            api_base_url: String::new(),
            user_id: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            project_dir_strategy: ProjectDirStrategy::default(),
        }
    }
}

/// Default per-window timeout, in seconds.
const fn default_timeout_secs() -> u64 {
    600
}

/// Default credentials path, under the user's home directory.
fn default_credentials_path() -> PathBuf {
    PathBuf::from("~/.engine/credentials")
}

/// Default local engine launcher binary name, resolved via `PATH`.
fn default_engine_binary() -> PathBuf {
    PathBuf::from("engine")
}

/// Default cloud-aware client tool binary name, resolved via `PATH`.
fn default_cli_binary() -> PathBuf {
    PathBuf::from("engine-cli")
}

/// Default cloud poll interval, in seconds.
const fn default_poll_interval_secs() -> u64 {
    10
}

/// The full workspace configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backtest execution settings.
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Gate thresholds, reused directly from the gate evaluator.
    #[serde(default)]
    pub gates: GateBundle,
    /// Walk-forward window schedule.
    #[serde(default)]
    pub window_schedule: WindowSchedule,
    /// Sanity-flag severity thresholds.
    #[serde(default)]
    pub sanity_thresholds: SanityThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backtest: BacktestConfig::default(),
            gates: GateBundle::default(),
            window_schedule: WindowSchedule::default(),
            sanity_thresholds: SanityThresholds::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, falling back to defaults for any
    /// field the file omits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source: Box::new(source) })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations with out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.timeout_secs == 0 {
            return Err(ConfigError::Invalid("backtest.timeout_secs must be nonzero".to_string()));
        }
        if self.backtest.execution_mode == ExecutionMode::Cloud
            && (self.backtest.api_base_url.is_empty() || self.backtest.user_id.is_empty())
        {
            return Err(ConfigError::Invalid("cloud execution mode requires backtest.api_base_url and backtest.user_id".to_string()));
        }
        if self.gates.max_drawdown <= 0.0 {
            return Err(ConfigError::Invalid("gates.max_drawdown must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.gates.min_consistency) {
            return Err(ConfigError::Invalid("gates.min_consistency must be between 0 and 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.gates.max_p_value) {
            return Err(ConfigError::Invalid("gates.max_p_value must be between 0 and 1".to_string()));
        }
        Ok(())
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
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.backtest.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_drawdown_gate_is_rejected() {
        let mut config = Config::default();
        config.gates.max_drawdown = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str("[backtest]\ntimeout_secs = 120\n").expect("parses");
        assert_eq!(config.backtest.timeout_secs, 120);
        assert_eq!(config.backtest.execution_mode, ExecutionMode::Local);
        assert_eq!(config.gates.min_sharpe, GateBundle::default().min_sharpe);
    }
}
