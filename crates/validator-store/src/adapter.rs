// crates/validator-store/src/adapter.rs
// ============================================================================
// Module: Persistence Adapter
// Description: Logical candidate operations over a WorkspaceLayout.
// Purpose: Implement C9 — load/list/move candidates, write derived artifacts.
// Dependencies: crate::layout, validator-verify, validator-gate, serde_json,
//               serde_yaml
// ============================================================================

//! ## Overview
//! [`StoreAdapter`] is the only thing in this crate that knows how a
//! candidate's lifecycle status maps to a directory, or how a walk-forward's
//! result maps to a file name under `validations/<id>/`. Every write goes
//! through [`crate::layout::atomic_write`], so writing the same content
//! twice is a no-op and writing different content overwrites cleanly.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use validator_gate::GateReport;
use validator_gate::WalkForward;
use validator_ids::CandidateId;
use validator_verify::CandidateDocument;
use validator_verify::CandidateStatus;

use crate::layout::WorkspaceLayout;
use crate::layout::atomic_write;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the persistence adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The candidate could not be found in any status directory.
    #[error("candidate {0} not found")]
    NotFound(CandidateId),
    /// An I/O error occurred reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation was attempting to touch.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The candidate document could not be deserialized.
    #[error("failed to parse candidate document at {path}: {source}")]
    InvalidDocument {
        /// Path of the unparseable document.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },
    /// A derived artifact could not be serialized.
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Translates candidate-level operations into reads/writes under a
/// [`WorkspaceLayout`].
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    layout: WorkspaceLayout,
}

impl StoreAdapter {
    /// Builds an adapter over `layout`, creating its directories if absent.
    pub fn new(layout: WorkspaceLayout) -> std::io::Result<Self> {
        layout.ensure_directories()?;
        Ok(Self { layout })
    }

    /// Loads the candidate document for `id`, searching every status
    /// directory.
    pub fn load_candidate(&self, id: &CandidateId) -> Result<CandidateDocument, StoreError> {
        let path = self.layout.find_candidate_path(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        serde_yaml::from_str(&raw).map_err(|source| StoreError::InvalidDocument { path, source })
    }

    /// Lists candidate identifiers whose document currently lives under
    /// `status`.
    pub fn list_candidates_in(&self, status: CandidateStatus) -> Result<Vec<CandidateId>, StoreError> {
        let dir = self.layout.strategies_dir(status);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io { path: dir.clone(), source })?;
            if let Some(stem) = entry.path().file_stem() {
                ids.push(CandidateId::new(stem.to_string_lossy().into_owned()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Moves a candidate's document from its current status directory to
    /// `new_status`, rewriting the document's embedded `status` field.
    pub fn move_candidate(&self, id: &CandidateId, new_status: CandidateStatus) -> Result<(), StoreError> {
        let old_path = self.layout.find_candidate_path(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let raw = fs::read_to_string(&old_path).map_err(|source| StoreError::Io { path: old_path.clone(), source })?;
        let mut document: CandidateDocument =
            serde_yaml::from_str(&raw).map_err(|source| StoreError::InvalidDocument { path: old_path.clone(), source })?;
        document.status = new_status;
        let extension = old_path.extension().map_or_else(|| "yaml".to_string(), |ext| ext.to_string_lossy().into_owned());
        let new_path = self.layout.candidate_path(new_status, id, &extension);
        let serialized = serde_yaml::to_string(&document).map_err(|source| StoreError::InvalidDocument { path: new_path.clone(), source })?;
        atomic_write(&new_path, serialized.as_bytes()).map_err(|source| StoreError::Io { path: new_path.clone(), source })?;
        if old_path != new_path {
            fs::remove_file(&old_path).map_err(|source| StoreError::Io { path: old_path, source })?;
        }
        Ok(())
    }

    /// Writes the generated backtest program for `id`.
    pub fn write_backtest_program(&self, id: &CandidateId, program: &str) -> Result<(), StoreError> {
        let path = self.layout.validation_dir(id).join("backtest.py");
        atomic_write(&path, program.as_bytes()).map_err(|source| StoreError::Io { path, source })
    }

    /// Writes the raw engine output of the most recent run for `id`.
    pub fn write_last_output(&self, id: &CandidateId, output: &str) -> Result<(), StoreError> {
        let path = self.layout.validation_dir(id).join("last_output.txt");
        atomic_write(&path, output.as_bytes()).map_err(|source| StoreError::Io { path, source })
    }

    /// Writes the serialized walk-forward result for `id`.
    pub fn write_run_result(&self, id: &CandidateId, walk_forward: &WalkForward) -> Result<(), StoreError> {
        let path = self.layout.validation_dir(id).join("run_result.json");
        let serialized = serde_json::to_vec_pretty(walk_forward)?;
        atomic_write(&path, &serialized).map_err(|source| StoreError::Io { path, source })
    }

    /// Writes the gate evaluator's report for `id`.
    pub fn write_gate_report(&self, id: &CandidateId, report: &GateReport) -> Result<(), StoreError> {
        let path = self.layout.validation_dir(id).join("backtest_results.yaml");
        let serialized = serde_yaml::to_string(report).map_err(|source| StoreError::InvalidDocument { path: path.clone(), source })?;
        atomic_write(&path, serialized.as_bytes()).map_err(|source| StoreError::Io { path, source })
    }

    /// Writes the compact determination summary for `id`.
    pub fn write_determination(&self, id: &CandidateId, summary: &validator_core::SafeSummary) -> Result<(), StoreError> {
        let path = self.layout.validation_dir(id).join("determination.json");
        let serialized = serde_json::to_vec_pretty(summary)?;
        atomic_write(&path, &serialized).map_err(|source| StoreError::Io { path, source })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
