// crates/validator-data/src/lib.rs
// ============================================================================
// Module: Validator Data Availability
// Description: Data-source registry and pattern recognizer for candidate data requirements.
// Purpose: Decide whether every data requirement a candidate names is satisfiable.
// Dependencies: validator-ids, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate implements C1 of the validation pipeline: given a list of
//! logical data-requirement identifiers, decide for each whether it is
//! satisfiable, and if so through which tier of the data hierarchy and with
//! what provenance. Resolution consults an explicit registry first and falls
//! through to a pattern recognizer for a well-known universe of instrument
//! tickers. Failure to satisfy a requirement is not itself fatal here; it is
//! a signal the orchestrator uses to decide BLOCKED.

#![forbid(unsafe_code)]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod pattern;
pub mod registry;

pub use pattern::is_native_pattern;
pub use registry::DataAvailability;
pub use registry::DataRegistry;
pub use registry::DataRegistryError;
pub use registry::DataSource;
pub use registry::DataTier;
