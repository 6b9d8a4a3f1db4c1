// crates/validator-codegen/src/llm.rs
// ============================================================================
// Module: Generator LLM Capability
// Description: Capability interface for the language-model fallback and correction path.
// Purpose: Decouple C3/C5 from any concrete language-model client.
// Dependencies: validator-verify::candidate
// ============================================================================

//! ## Overview
//! The generator's language-model dependency is modeled as a capability
//! interface with one `generate` operation and one `correct` operation.
//! Offline mode returns a typed [`LlmOutcome::Offline`] marker that higher
//! layers treat as a structured non-result, never as an error.

use validator_verify::CandidateDocument;

// ============================================================================
// SECTION: Outcome type
// ============================================================================

/// Outcome of a language-model generation or correction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmOutcome {
    /// The client produced a reply; extraction happens separately.
    Reply(String),
    /// No client is configured or the client is unreachable; this is not an
    /// error, it is a structured signal that the LLM path is unavailable.
    Offline,
}

// ============================================================================
// SECTION: Capability interface
// ============================================================================

/// Capability interface the generator depends on for its LLM fallback and
/// correction paths.
///
/// # Invariants
/// - Implementations never panic; failures surface as `Err` or as
///   [`LlmOutcome::Offline`], never by aborting the process.
pub trait GeneratorClient {
    /// Generates a program from a candidate document, given a fixed set of
    /// API-level reminders to include in the prompt.
    ///
    /// # Errors
    ///
    /// Returns an error string when the underlying transport fails in a way
    /// that is not simply "no client configured" (that case is
    /// [`LlmOutcome::Offline`]).
    fn generate(&self, candidate: &CandidateDocument, reminders: &[&str]) -> Result<LlmOutcome, String>;

    /// Requests a corrected program given the failing program, the error
    /// text, and the original candidate.
    ///
    /// # Errors
    ///
    /// Returns an error string when the underlying transport fails.
    fn correct(
        &self,
        failing_program: &str,
        error_text: &str,
        candidate: &CandidateDocument,
    ) -> Result<LlmOutcome, String>;
}

// ============================================================================
// SECTION: Reply extraction
// ============================================================================

/// Extracts a program from a language-model reply. Tolerates either a
/// fenced code block or a whole reply that "looks like code" (contains a
/// class definition and a function definition).
#[must_use]
pub fn extract_program(reply: &str) -> Option<String> {
    if let Some(fenced) = extract_fenced_block(reply) {
        return Some(fenced);
    }
    if looks_like_code(reply) {
        return Some(reply.trim().to_string());
    }
    None
}

fn extract_fenced_block(reply: &str) -> Option<String> {
    let start = reply.find("```")?;
    let after_open = &reply[start + 3..];
    let first_line_end = after_open.find('\n').unwrap_or(0);
    let body_start = first_line_end + 1;
    let body = &after_open[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

fn looks_like_code(reply: &str) -> bool {
    reply.contains("class ") && (reply.contains("def ") || reply.contains("fn "))
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
    fn extracts_fenced_python_block() {
        let reply = "Here you go:\n```python\nclass Foo:\n    def bar(self):\n        pass\n```\nLet me know.";
        let program = extract_program(reply).expect("extracted");
        assert!(program.starts_with("class Foo"));
    }

    #[test]
    fn extracts_bare_reply_that_looks_like_code() {
        let reply = "class Foo:\n    def bar(self):\n        pass\n";
        let program = extract_program(reply).expect("extracted");
        assert_eq!(program, reply.trim());
    }

    #[test]
    fn rejects_prose_reply() {
        let reply = "I think this strategy looks promising overall.";
        assert!(extract_program(reply).is_none());
    }
}
