// crates/validator-cli/src/lib.rs
// ============================================================================
// Module: Validator CLI Library
// Description: Shared pipeline, report, and logging modules for the binary
//              entry point and for scenario/integration tests.
// Purpose: Give `tests/` a crate to link against without duplicating the
//          command dispatcher's stage-sequencing logic.
// Dependencies: validator-core, validator-store, validator-driver,
//               validator-codegen, validator-data, validator-verify.
// ============================================================================

//! ## Overview
//! `src/main.rs` is a thin command dispatcher over this library; every
//! stage-sequencing decision lives here so the same code path backs the
//! `validate` binary and the crate's scenario tests.

/// Environment-driven logging setup.
pub mod logging;
/// The offline `GeneratorClient` this workspace ships.
pub mod offline;
/// Candidate pipeline: `verify`/`run` stage sequencing.
pub mod pipeline;
/// Stdout/stderr line-writing helpers.
pub mod report;
