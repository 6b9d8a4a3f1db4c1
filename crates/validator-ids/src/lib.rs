// crates/validator-ids/src/lib.rs
// ============================================================================
// Module: Validator Identifiers
// Description: Canonical opaque identifiers shared across the validation pipeline.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This crate defines the identifiers threaded through every stage of the
//! validation pipeline: the candidate being validated, the logical data
//! requirements it declares, and the 1-based windows a walk-forward run
//! executes. Identifiers are opaque on the wire; callers must not parse or
//! reconstruct them from parts.

#![forbid(unsafe_code)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Candidate identifier
// ============================================================================

/// Identifier of a candidate strategy document (e.g. `STRAT-037`).
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    /// Creates a new candidate identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Data requirement identifier
// ============================================================================

/// Logical data-requirement identifier (e.g. `spy_prices`, `risk_free_rate`).
///
/// # Invariants
/// - Stored exactly as supplied; normalization (lowercasing, separator
///   substitution) is the responsibility of the data-availability resolver,
///   not of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRequirementId(String);

impl DataRequirementId {
    /// Creates a new data-requirement identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataRequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataRequirementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataRequirementId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Window identifier
// ============================================================================

/// 1-based identifier of a window within a walk-forward run.
///
/// # Invariants
/// - Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(NonZeroU32);

impl WindowId {
    /// Creates a new window identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU32) -> Self {
        Self(id)
    }

    /// Creates a window identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw 1-based window number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
