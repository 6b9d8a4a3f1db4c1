// crates/validator-cli/src/offline.rs
// ============================================================================
// Module: Offline Generator Client
// Description: A GeneratorClient that always reports itself unreachable.
// Purpose: Give the CLI a concrete client to pass through C3/C5 when no
//          language-model transport has been wired into this workspace.
// Dependencies: validator-codegen
// ============================================================================

//! ## Overview
//! No language-model transport ships with this crate. [`OfflineGeneratorClient`]
//! is what the template path and the correction loop see instead: every call
//! reports [`LlmOutcome::Offline`], which `validator-codegen` and
//! `validator-driver` already treat as a structured non-result rather than an
//! error. A future transport can replace this without touching either
//! crate's contract.

use validator_codegen::GeneratorClient;
use validator_codegen::LlmOutcome;
use validator_verify::CandidateDocument;

// ============================================================================
// SECTION: Client
// ============================================================================

/// A [`GeneratorClient`] with no backing transport; every call is offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGeneratorClient;

impl GeneratorClient for OfflineGeneratorClient {
    fn generate(&self, _candidate: &CandidateDocument, _reminders: &[&str]) -> Result<LlmOutcome, String> {
        Ok(LlmOutcome::Offline)
    }

    fn correct(&self, _failing_program: &str, _error_text: &str, _candidate: &CandidateDocument) -> Result<LlmOutcome, String> {
        Ok(LlmOutcome::Offline)
    }
}
