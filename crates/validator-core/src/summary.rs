// crates/validator-core/src/summary.rs
// ============================================================================
// Module: Safe Summary
// Description: Redacted, client-facing view of a candidate's run state.
// Purpose: Report status without leaking raw backtest metrics or parameters.
// Dependencies: crate::state, serde
// ============================================================================

//! ## Overview
//! A [`SafeSummary`] is what a CLI or future API surface shows a caller: the
//! candidate's state, its determination if one has been reached, and the
//! names of any sanity flags raised — never the underlying numeric metrics
//! or locked hypothesis parameters.

use serde::Deserialize;
use serde::Serialize;
use validator_gate::Determination;
use validator_ids::CandidateId;

use crate::state::CandidateState;
use crate::state::SanitySeverity;

// ============================================================================
// SECTION: Safe summary
// ============================================================================

/// Redacted status view of one candidate's validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeSummary {
    /// Candidate identifier.
    pub candidate_id: CandidateId,
    /// Current state in the orchestrator's state machine.
    pub state: CandidateState,
    /// Final determination, if one has been reached.
    pub determination: Option<Determination>,
    /// Severities of any accumulated sanity flags, most severe first.
    pub sanity_flag_severities: Vec<SanitySeverity>,
    /// Optional human-readable status line.
    pub message: Option<String>,
}

impl SafeSummary {
    /// Builds a summary with no determination and no sanity flags yet.
    #[must_use]
    pub const fn new(candidate_id: CandidateId, state: CandidateState) -> Self {
        Self { candidate_id, state, determination: None, sanity_flag_severities: Vec::new(), message: None }
    }
}
