// crates/validator-codegen/src/generator.rs
// ============================================================================
// Module: Generator Entry Point
// Description: Ties template selection, LLM fallback, and post-processing
//              into the single (program, provenance) contract C3 exposes.
// Purpose: Implement C3's `generate` operation.
// Dependencies: validator-verify::candidate, crate::{llm, postprocess, template}
// ============================================================================

//! ## Overview
//! `generate` always returns a program paired with a [`Provenance`] record
//! describing which path produced it. For the template path, identical
//! input produces identical output; for the LLM path, determinism is not
//! promised. Both paths are normalized by the same [`postprocess`] pipeline
//! before being returned.

use validator_verify::CandidateDocument;

use crate::llm::GeneratorClient;
use crate::llm::LlmOutcome;
use crate::llm::extract_program;
use crate::postprocess::postprocess;
use crate::template::RenderContext;
use crate::template::TemplateId;
use crate::template::render;
use crate::template::select_template;

// ============================================================================
// SECTION: Output types
// ============================================================================

/// A generated backtest program paired with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProgram {
    /// The post-processed program source.
    pub program: String,
    /// Which path produced `program`, and with what input.
    pub provenance: Provenance,
}

/// Records which generation path produced a [`GeneratedProgram`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// The deterministic template path, naming the template used.
    Template(TemplateId),
    /// The language-model fallback path.
    Llm,
}

/// Failure modes of the `generate` operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// No template matched and the LLM client reported it is offline.
    #[error("no template matched candidate and the language-model client is offline")]
    NoTemplateAndOffline,
    /// No template matched, the client is online, but its reply could not
    /// be interpreted as a program.
    #[error("no template matched candidate and the language-model reply was not a program")]
    UnusableLlmReply,
    /// The underlying language-model transport failed.
    #[error("language-model transport failure: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: generate
// ============================================================================

/// Generates a program for `candidate`, preferring the deterministic
/// template path and falling back to `client` only when no template
/// matches the candidate's declared shape.
///
/// # Errors
///
/// Returns [`GenerateError`] when no template matches and the language
/// model path also fails to produce a usable program.
pub fn generate(
    candidate: &CandidateDocument,
    generated_at: impl Into<String>,
    client: &dyn GeneratorClient,
    reminders: &[&str],
) -> Result<GeneratedProgram, GenerateError> {
    let generated_at = generated_at.into();

    if let Some(template) = select_template(candidate.strategy_type.as_deref(), candidate.signal_type.as_deref()) {
        let ctx = RenderContext::from_candidate(candidate, generated_at);
        let rendered = render(template, &ctx);
        return Ok(GeneratedProgram {
            program: postprocess(&rendered),
            provenance: Provenance::Template(template),
        });
    }

    match client.generate(candidate, reminders).map_err(GenerateError::Transport)? {
        LlmOutcome::Offline => Err(GenerateError::NoTemplateAndOffline),
        LlmOutcome::Reply(reply) => {
            let program = extract_program(&reply).ok_or(GenerateError::UnusableLlmReply)?;
            Ok(GeneratedProgram {
                program: postprocess(&program),
                provenance: Provenance::Llm,
            })
        }
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
    use validator_verify::CandidateDocument;
    use validator_verify::CandidateStatus;
    use validator_verify::Tags;

    struct OfflineClient;

    impl GeneratorClient for OfflineClient {
        fn generate(&self, _candidate: &CandidateDocument, _reminders: &[&str]) -> Result<LlmOutcome, String> {
            Ok(LlmOutcome::Offline)
        }

        fn correct(
            &self,
            _failing_program: &str,
            _error_text: &str,
            _candidate: &CandidateDocument,
        ) -> Result<LlmOutcome, String> {
            Ok(LlmOutcome::Offline)
        }
    }

    struct ReplyClient(&'static str);

    impl GeneratorClient for ReplyClient {
        fn generate(&self, _candidate: &CandidateDocument, _reminders: &[&str]) -> Result<LlmOutcome, String> {
            Ok(LlmOutcome::Reply(self.0.to_string()))
        }

        fn correct(
            &self,
            _failing_program: &str,
            _error_text: &str,
            _candidate: &CandidateDocument,
        ) -> Result<LlmOutcome, String> {
            Ok(LlmOutcome::Reply(self.0.to_string()))
        }
    }

    fn candidate_with(strategy_type: Option<&str>) -> CandidateDocument {
        CandidateDocument {
            id: "STRAT-001".into(),
            name: "Test".to_string(),
            description: None,
            tags: Tags::default(),
            status: CandidateStatus::Pending,
            universe: None,
            entry: None,
            exit: None,
            position: None,
            parameters: serde_json::json!({}),
            data_requirements: None,
            hypothesis: None,
            strategy_type: strategy_type.map(str::to_string),
            signal_type: None,
        }
    }

    #[test]
    fn template_path_is_used_when_a_template_matches() {
        let candidate = candidate_with(Some("momentum_rotation"));
        let result = generate(&candidate, "2026-01-01T00:00:00Z", &OfflineClient, &[]).expect("generated");
        assert_eq!(result.provenance, Provenance::Template(TemplateId::Momentum));
    }

    #[test]
    fn offline_client_is_a_typed_non_error_when_no_template_matches() {
        let candidate = candidate_with(Some("exotic_derivative_arb"));
        let err = generate(&candidate, "2026-01-01T00:00:00Z", &OfflineClient, &[]).unwrap_err();
        assert_eq!(err, GenerateError::NoTemplateAndOffline);
    }

    #[test]
    fn llm_path_is_used_and_postprocessed_when_no_template_matches() {
        let candidate = candidate_with(Some("exotic_derivative_arb"));
        let reply = "```python\nclass Strat001(QCAlgorithm):\n    def Initialize(self):\n        self.SetCash(100000)\n```";
        let client = ReplyClient(reply);
        let result = generate(&candidate, "2026-01-01T00:00:00Z", &client, &[]).expect("generated");
        assert_eq!(result.provenance, Provenance::Llm);
        assert!(result.program.contains("SetBenchmark"));
    }

    #[test]
    fn unusable_llm_reply_is_reported_distinctly_from_offline() {
        let candidate = candidate_with(Some("exotic_derivative_arb"));
        let client = ReplyClient("I am not sure this strategy makes sense.");
        let err = generate(&candidate, "2026-01-01T00:00:00Z", &client, &[]).unwrap_err();
        assert_eq!(err, GenerateError::UnusableLlmReply);
    }
}
