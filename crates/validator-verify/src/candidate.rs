// crates/validator-verify/src/candidate.rs
// ============================================================================
// Module: Candidate Document
// Description: Typed shape of a candidate strategy document.
// Purpose: Provide the fields C2 and C3 read without re-parsing raw JSON.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The candidate document is produced externally (ingestion, out of scope
//! here) and read by the core. Its shape varies by strategy kind, so the
//! loosely-typed sub-configs (`entry`, `parameters`) are kept as
//! [`serde_json::Value`] and interpreted by the consumer that needs them;
//! the fields every check and every template rely on are typed directly.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use validator_ids::CandidateId;

// ============================================================================
// SECTION: Top-level document
// ============================================================================

/// A candidate trading-strategy document as read by the core.
///
/// # Invariants
/// - `status` and the document's location in the persistence layout must
///   agree; enforcing that agreement is the persistence adapter's job, not
///   this type's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Candidate identifier.
    pub id: CandidateId,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tags, including the declared hypothesis type(s).
    #[serde(default)]
    pub tags: Tags,
    /// Lifecycle status.
    pub status: CandidateStatus,
    /// Universe descriptor.
    #[serde(default)]
    pub universe: Option<Universe>,
    /// Entry condition descriptor.
    #[serde(default)]
    pub entry: Option<Entry>,
    /// Exit condition descriptor.
    #[serde(default)]
    pub exit: Option<Exit>,
    /// Position-sizing descriptor.
    #[serde(default)]
    pub position: Option<Position>,
    /// Free-form strategy parameters.
    #[serde(default)]
    pub parameters: Value,
    /// Declared data requirements.
    #[serde(default)]
    pub data_requirements: Option<DataRequirements>,
    /// Hypothesis narrative.
    #[serde(default)]
    pub hypothesis: Option<Hypothesis>,
    /// Discriminant used by C3 to select a code-generation template.
    #[serde(default)]
    pub strategy_type: Option<String>,
    /// Signal-type discriminant, refining `strategy_type` for template
    /// selection.
    #[serde(default)]
    pub signal_type: Option<String>,
}

/// Candidate lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Awaiting validation.
    Pending,
    /// Validated by a prior run.
    Validated,
    /// Invalidated by a prior run.
    Invalidated,
    /// Blocked by a prior run.
    Blocked,
}

impl CandidateStatus {
    /// Returns the directory name this status maps to under `strategies/`.
    #[must_use]
    pub const fn directory_name(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Validated => "validated",
            CandidateStatus::Invalidated => "invalidated",
            CandidateStatus::Blocked => "blocked",
        }
    }
}

/// Tag bundle attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    /// Declared hypothesis type(s) (e.g. "momentum", "mean_reversion").
    #[serde(default)]
    pub hypothesis_type: Vec<String>,
}

// ============================================================================
// SECTION: Universe
// ============================================================================

/// Universe descriptor: either a static symbol list or a dynamic filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    /// Universe kind.
    #[serde(rename = "type")]
    pub universe_type: Option<UniverseType>,
    /// Explicit symbol list, used when `universe_type` is `Static`.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Explicit instrument list, an alternate key some candidates use in
    /// place of `symbols`.
    #[serde(default)]
    pub instruments: Vec<String>,
    /// Dynamic-universe filters (e.g. `["point_in_time"]`).
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Kind of universe construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseType {
    /// Fixed symbol list, known at hypothesis time.
    Static,
    /// Computed at run time from a filter description.
    Dynamic,
}

// ============================================================================
// SECTION: Entry / exit / position
// ============================================================================

/// Entry condition descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry kind discriminant.
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    /// Signal-based entry config, when present.
    #[serde(default)]
    pub signals: Option<Value>,
    /// Technical-indicator entry config, when present.
    #[serde(default)]
    pub technical: Option<EntryConfig>,
    /// Fundamental-data entry config, when present.
    #[serde(default)]
    pub fundamental: Option<Value>,
}

/// Technical-indicator entry sub-config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// The condition expression, checked for look-ahead keyword hits.
    #[serde(default)]
    pub condition: Option<String>,
}

/// Exit condition descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    /// Ordered exit paths; at least one should mention a stop.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Position-sizing descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Sizing sub-config.
    #[serde(default)]
    pub sizing: Option<Sizing>,
}

/// Sizing sub-config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    /// Named sizing method (e.g. "fixed_fractional", "volatility_target").
    #[serde(default)]
    pub method: Option<String>,
    /// Simple fixed size, used when no `method`/sizing sub-dict is given.
    #[serde(default)]
    pub size: Option<f64>,
    /// Simple fixed allocation, an alternate to `size`.
    #[serde(default)]
    pub allocation: Option<f64>,
}

/// Declared data requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRequirements {
    /// Primary logical data-source identifiers.
    #[serde(default)]
    pub primary: Vec<String>,
}

/// Hypothesis narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Short testable statement.
    #[serde(default)]
    pub summary: Option<String>,
    /// Why the edge is believed to exist.
    #[serde(default)]
    pub edge: Option<HypothesisEdge>,
}

/// Edge rationale nested under `hypothesis`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisEdge {
    /// Free-form rationale text.
    #[serde(default)]
    pub why_exists: Option<String>,
}
