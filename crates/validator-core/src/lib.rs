// crates/validator-core/src/lib.rs
// ============================================================================
// Module: Validator Core
// Description: The orchestrator state machine tying every stage together.
// Purpose: Implement C8 — candidate lifecycle, hypothesis lock-in, sanity
//          flags, and the final-determination decision tree.
// Dependencies: validator-ids, validator-gate, time
// ============================================================================

//! ## Overview
//! [`state`] holds the state machine itself ([`CandidateRun`]); [`clock`]
//! supplies the `Clock` abstraction every transition is stamped with;
//! [`summary`] builds the redacted client-facing [`summary::SafeSummary`].

#![forbid(unsafe_code)]

pub mod clock;
pub mod state;
pub mod summary;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use state::CandidateRun;
pub use state::CandidateState;
pub use state::CoreError;
pub use state::HypothesisLock;
pub use state::SanityFlag;
pub use state::SanitySeverity;
pub use state::SanityThresholds;
pub use state::StateRecord;
pub use state::classify_sanity_severity;
pub use summary::SafeSummary;
