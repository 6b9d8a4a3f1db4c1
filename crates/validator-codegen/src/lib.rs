// crates/validator-codegen/src/lib.rs
// ============================================================================
// Module: Validator Codegen
// Description: Renders a candidate into an executable backtest program.
// Purpose: Implement the template and LLM-fallback generation paths (C3).
// Dependencies: validator-ids, validator-verify, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate implements C3 of the validation pipeline. Two paths produce a
//! [`GeneratedProgram`]: a deterministic template path keyed on
//! `(strategy_type, signal_type)`, and a language-model fallback used when no
//! template matches. Both paths are followed by a single post-processing
//! step that normalizes known API idioms (see [`postprocess`]).

#![forbid(unsafe_code)]

pub mod generator;
pub mod llm;
pub mod postprocess;
pub mod template;

pub use generator::GeneratedProgram;
pub use generator::Provenance;
pub use generator::generate;
pub use llm::GeneratorClient;
pub use llm::LlmOutcome;
pub use postprocess::postprocess;
pub use template::TemplateId;
pub use template::select_template;
