// crates/validator-store/src/layout.rs
// ============================================================================
// Module: Workspace Layout
// Description: File-tree paths and atomic writes under a workspace root.
// Purpose: Translate logical persistence operations into filesystem paths.
// Dependencies: std::fs, sha2
// ============================================================================

//! ## Overview
//! [`WorkspaceLayout`] knows exactly two kinds of location: a candidate
//! document under `strategies/<status>/<id>.<ext>`, and a derived artifact
//! under `validations/<id>/...`. [`atomic_write`] is the single write
//! primitive every higher-level write goes through: write to a sibling
//! temp file, then rename over the destination, so a crash mid-write never
//! leaves a half-written file at the real path.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use sha2::Digest;
use sha2::Sha256;
use validator_verify::CandidateStatus;
use validator_ids::CandidateId;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Root of a validation workspace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    /// Points a layout at `root`. Does not create any directories.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates every directory this layout expects to exist.
    pub fn ensure_directories(&self) -> io::Result<()> {
        for status in [CandidateStatus::Pending, CandidateStatus::Validated, CandidateStatus::Invalidated, CandidateStatus::Blocked] {
            fs::create_dir_all(self.strategies_dir(status))?;
        }
        fs::create_dir_all(self.validations_root())?;
        Ok(())
    }

    /// Directory holding candidate documents for one status.
    #[must_use]
    pub fn strategies_dir(&self, status: CandidateStatus) -> PathBuf {
        self.root.join("strategies").join(status.directory_name())
    }

    /// Path a candidate document for `id` would live at under `status`,
    /// with the given file extension (`"yaml"` or `"json"`).
    #[must_use]
    pub fn candidate_path(&self, status: CandidateStatus, id: &CandidateId, extension: &str) -> PathBuf {
        self.strategies_dir(status).join(format!("{}.{extension}", id.as_str()))
    }

    /// Searches every status directory for `id`'s candidate document,
    /// returning the first match found.
    #[must_use]
    pub fn find_candidate_path(&self, id: &CandidateId) -> Option<PathBuf> {
        for status in [CandidateStatus::Pending, CandidateStatus::Validated, CandidateStatus::Invalidated, CandidateStatus::Blocked] {
            for extension in ["yaml", "json"] {
                let path = self.candidate_path(status, id, extension);
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Root of the derived-artifacts directory for `id`.
    #[must_use]
    pub fn validation_dir(&self, id: &CandidateId) -> PathBuf {
        self.validations_root().join(id.as_str())
    }

    /// Root of the derived-artifacts tree.
    fn validations_root(&self) -> PathBuf {
        self.root.join("validations")
    }

    /// Path to the registry document.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    /// Path to the workspace configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

// ============================================================================
// SECTION: Atomic, idempotent writes
// ============================================================================

/// Writes `contents` to `path` atomically (write-temp-then-rename). If
/// `path` already holds byte-identical content, this is a no-op.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if file_hash(path).ok().flatten() == Some(content_hash(contents)) {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = sibling_temp_path(path);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Builds a temp path alongside `path`, so the final rename stays on one
/// filesystem.
fn sibling_temp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().map_or_else(|| "artifact".to_string(), |name| name.to_string_lossy().into_owned());
    path.with_file_name(format!(".{file_name}.tmp"))
}

/// Reads and hashes the file at `path`, if it exists.
fn file_hash(path: &Path) -> io::Result<Option<[u8; 32]>> {
    match fs::read(path) {
        Ok(existing) => Ok(Some(content_hash(&existing))),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// SHA-256 digest of `contents`.
fn content_hash(contents: &[u8]) -> [u8; 32] {
    Sha256::digest(contents).into()
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
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn candidate_path_uses_status_directory_and_extension() {
        let layout = WorkspaceLayout::new("/workspace");
        let id = CandidateId::new("alpha-001");
        let path = layout.candidate_path(CandidateStatus::Pending, &id, "yaml");
        assert_eq!(path, Path::new("/workspace/strategies/pending/alpha-001.yaml"));
    }

    #[test]
    fn atomic_write_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("file.json");
        atomic_write(&path, b"{}").expect("write succeeds");
        assert_eq!(fs::read(&path).expect("read back"), b"{}");
    }

    #[test]
    fn atomic_write_of_identical_content_is_a_no_op() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("file.json");
        atomic_write(&path, b"{\"a\":1}").expect("first write");
        let modified_before = fs::metadata(&path).expect("metadata").modified().expect("mtime");
        atomic_write(&path, b"{\"a\":1}").expect("second write");
        let modified_after = fs::metadata(&path).expect("metadata").modified().expect("mtime");
        assert_eq!(modified_before, modified_after);
    }

    #[test]
    fn atomic_write_of_different_content_overwrites() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("file.json");
        atomic_write(&path, b"{\"a\":1}").expect("first write");
        atomic_write(&path, b"{\"a\":2}").expect("second write");
        assert_eq!(fs::read(&path).expect("read back"), b"{\"a\":2}");
    }

    #[test]
    fn find_candidate_path_returns_none_when_absent() {
        let dir = tempdir().expect("tempdir");
        let layout = WorkspaceLayout::new(dir.path());
        layout.ensure_directories().expect("ensure dirs");
        assert!(layout.find_candidate_path(&CandidateId::new("missing")).is_none());
    }
}
