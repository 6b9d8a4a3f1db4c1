// crates/validator-verify/src/lib.rs
// ============================================================================
// Module: Validator Verify
// Description: Cheap structural pre-flight checks on a candidate.
// Purpose: Catch design errors before spending backtest resources.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This crate implements C2 of the validation pipeline: a fixed ordered
//! sequence of structural, keyword-based checks run against a candidate
//! document. Checks never consult external data; they only look at the
//! shape and text of the candidate itself.

#![forbid(unsafe_code)]

pub mod candidate;
pub mod checks;

pub use candidate::CandidateDocument;
pub use candidate::CandidateStatus;
pub use candidate::DataRequirements;
pub use candidate::Entry;
pub use candidate::EntryConfig;
pub use candidate::Exit;
pub use candidate::Hypothesis;
pub use candidate::HypothesisEdge;
pub use candidate::Position;
pub use candidate::Sizing;
pub use candidate::Tags;
pub use candidate::Universe;
pub use candidate::UniverseType;
pub use checks::Verification;
pub use checks::VerificationStatus;
pub use checks::VerificationTest;
pub use checks::verify;
