// crates/validator-data/src/registry.rs
// ============================================================================
// Module: Data Registry
// Description: Registry of explicit data sources plus the native-pattern fallback.
// Purpose: Resolve data requirements to an availability verdict with provenance.
// Dependencies: validator-ids, crate::pattern
// ============================================================================

//! ## Overview
//! The registry holds a flat list of [`DataSource`] records, each carrying a
//! per-tier availability map across a fixed hierarchy. Resolution walks the
//! hierarchy, highest tier first, and returns the first tier marked
//! available. A source absent from the registry falls through to
//! [`crate::pattern::is_native_pattern`] before being declared unsatisfiable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use validator_ids::DataRequirementId;

use crate::pattern;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while maintaining the data registry.
#[derive(Debug, thiserror::Error)]
pub enum DataRegistryError {
    /// A source with the given id is already registered.
    #[error("data source already registered: {0}")]
    AlreadyRegistered(String),
    /// A source with the given id does not exist.
    #[error("data source not found: {0}")]
    NotFound(String),
}

// ============================================================================
// SECTION: Tiers
// ============================================================================

/// One tier in the fixed data-availability hierarchy, ordered highest
/// priority first.
///
/// # Invariants
/// - `Ord` matches hierarchy priority: `QcNative` is preferred over every
///   other tier, `InternalExperimental` is preferred over none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTier {
    /// Native to the backtest engine (built-in symbol database).
    QcNative,
    /// Available in the engine vendor's object store.
    QcObjectStore,
    /// Purchased from an external data vendor.
    InternalPurchased,
    /// Curated in-house from purchased or native sources.
    InternalCurated,
    /// Experimental, unvetted internal data.
    InternalExperimental,
}

impl DataTier {
    /// All tiers, highest priority first.
    pub const HIERARCHY: [DataTier; 5] = [
        DataTier::QcNative,
        DataTier::QcObjectStore,
        DataTier::InternalPurchased,
        DataTier::InternalCurated,
        DataTier::InternalExperimental,
    ];
}

impl fmt::Display for DataTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DataTier::QcNative => "qc_native",
            DataTier::QcObjectStore => "qc_object_store",
            DataTier::InternalPurchased => "internal_purchased",
            DataTier::InternalCurated => "internal_curated",
            DataTier::InternalExperimental => "internal_experimental",
        };
        f.write_str(label)
    }
}

/// Per-tier availability entry for one [`DataSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEntry {
    /// Whether this tier reports the source as available.
    pub available: bool,
    /// Storage path, when the tier is path-addressed.
    pub path: Option<String>,
    /// Storage key, when the tier is key-addressed.
    pub key: Option<String>,
    /// Free-form provenance notes.
    pub notes: Option<String>,
}

impl TierEntry {
    /// Creates an available tier entry with no further provenance.
    #[must_use]
    pub const fn available() -> Self {
        Self {
            available: true,
            path: None,
            key: None,
            notes: None,
        }
    }
}

// ============================================================================
// SECTION: Resolution result
// ============================================================================

/// Availability verdict returned for one data requirement.
///
/// # Invariants
/// - `tier` is `Some` only when `available` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAvailability {
    /// Whether the requirement is satisfiable.
    pub available: bool,
    /// Highest-ranked available tier, if any.
    pub tier: Option<DataTier>,
    /// Storage path carried from the resolving tier, if any.
    pub path: Option<String>,
    /// Storage key carried from the resolving tier, if any.
    pub key: Option<String>,
    /// Free-form notes (e.g. why a requirement was unsatisfiable).
    pub notes: Option<String>,
}

impl DataAvailability {
    /// Builds an unavailable verdict with the given explanatory note.
    #[must_use]
    pub fn unavailable(notes: impl Into<String>) -> Self {
        Self {
            available: false,
            tier: None,
            path: None,
            key: None,
            notes: Some(notes.into()),
        }
    }
}

// ============================================================================
// SECTION: Data source
// ============================================================================

/// One registered data source, carrying a per-tier availability map.
///
/// # Invariants
/// - `availability` keys are drawn from [`DataTier::HIERARCHY`]; the
///   registry never inserts a tier outside that set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Logical identifier (normalized).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form data type label (e.g. "equity prices").
    pub data_type: String,
    /// Whether this source was synthesized by the pattern recognizer rather
    /// than explicitly registered.
    pub is_auto_recognized: bool,
    /// Per-tier availability, highest tier first when iterated via
    /// [`DataTier::HIERARCHY`].
    pub availability: BTreeMap<DataTier, TierEntry>,
}

impl DataSource {
    /// Returns the highest-ranked tier marked available, if any.
    #[must_use]
    pub fn best_source(&self) -> DataAvailability {
        for tier in DataTier::HIERARCHY {
            let Some(entry) = self.availability.get(&tier) else {
                continue;
            };
            if entry.available {
                return DataAvailability {
                    available: true,
                    tier: Some(tier),
                    path: entry.path.clone(),
                    key: entry.key.clone(),
                    notes: entry.notes.clone(),
                };
            }
        }
        DataAvailability::unavailable(format!("no tier reports {} as available", self.id))
    }

    /// Synthesizes the source the pattern recognizer implies for `normalized_id`.
    #[must_use]
    pub fn from_native_pattern(normalized_id: &str) -> Self {
        let mut availability = BTreeMap::new();
        availability.insert(DataTier::QcNative, TierEntry::available());
        let name = pattern::ticker_symbol(normalized_id).map_or_else(
            || normalized_id.to_string(),
            |ticker| format!("{ticker} Price Data"),
        );
        Self {
            id: normalized_id.to_string(),
            name,
            data_type: "native_price_series".to_string(),
            is_auto_recognized: true,
            availability,
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of explicit [`DataSource`] records, consulted before the
/// pattern-recognizer fallback.
///
/// # Invariants
/// - Entries are keyed by normalized id (see [`pattern::normalize`]).
#[derive(Debug, Clone, Default)]
pub struct DataRegistry {
    sources: BTreeMap<String, DataSource>,
}

impl DataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an explicit data source.
    ///
    /// # Errors
    ///
    /// Returns [`DataRegistryError::AlreadyRegistered`] if a source with the
    /// same normalized id already exists.
    pub fn register(&mut self, source: DataSource) -> Result<(), DataRegistryError> {
        let key = pattern::normalize(&source.id);
        if self.sources.contains_key(&key) {
            return Err(DataRegistryError::AlreadyRegistered(key));
        }
        self.sources.insert(key, source);
        Ok(())
    }

    /// Updates the availability of one tier for an existing source.
    ///
    /// # Errors
    ///
    /// Returns [`DataRegistryError::NotFound`] if no source with that id is
    /// registered.
    pub fn update_availability(
        &mut self,
        id: &str,
        tier: DataTier,
        entry: TierEntry,
    ) -> Result<(), DataRegistryError> {
        let key = pattern::normalize(id);
        let source = self
            .sources
            .get_mut(&key)
            .ok_or_else(|| DataRegistryError::NotFound(key.clone()))?;
        source.availability.insert(tier, entry);
        Ok(())
    }

    /// Looks up a source by id, consulting the registry first and the
    /// pattern recognizer second.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DataSource> {
        let key = pattern::normalize(id);
        if let Some(source) = self.sources.get(&key) {
            return Some(source.clone());
        }
        if pattern::is_native_pattern(&key) {
            return Some(DataSource::from_native_pattern(&key));
        }
        None
    }

    /// Resolves a batch of requirement identifiers to their availability
    /// verdicts, preserving input order.
    #[must_use]
    pub fn check_availability(
        &self,
        requirement_ids: &[DataRequirementId],
    ) -> Vec<(DataRequirementId, DataAvailability)> {
        requirement_ids
            .iter()
            .map(|id| {
                let availability = self.get(id.as_str()).map_or_else(
                    || DataAvailability::unavailable(format!("source not found in registry: {id}")),
                    |source| source.best_source(),
                );
                (id.clone(), availability)
            })
            .collect()
    }

    /// Lists all explicitly registered sources (auto-recognized sources are
    /// synthesized on demand and never listed here).
    #[must_use]
    pub fn list(&self) -> Vec<&DataSource> {
        self.sources.values().collect()
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

    #[test]
    fn explicit_registry_entry_wins_over_pattern() {
        let mut registry = DataRegistry::new();
        let mut availability = BTreeMap::new();
        availability.insert(DataTier::InternalCurated, TierEntry::available());
        registry
            .register(DataSource {
                id: "spy_prices".to_string(),
                name: "SPY curated prices".to_string(),
                data_type: "equity_prices".to_string(),
                is_auto_recognized: false,
                availability,
            })
            .expect("register");

        let resolved = registry.get("spy_prices").expect("resolved");
        assert!(!resolved.is_auto_recognized);
        assert_eq!(resolved.best_source().tier, Some(DataTier::InternalCurated));
    }

    #[test]
    fn pattern_fallback_resolves_unregistered_native_ticker() {
        let registry = DataRegistry::new();
        let resolved = registry.get("qqq_data").expect("pattern match");
        assert!(resolved.is_auto_recognized);
        assert_eq!(resolved.best_source().tier, Some(DataTier::QcNative));
    }

    #[test]
    fn unknown_requirement_is_unavailable() {
        let registry = DataRegistry::new();
        assert!(registry.get("totally_unknown_thing").is_none());
    }

    #[test]
    fn check_availability_preserves_order() {
        let registry = DataRegistry::new();
        let ids = vec![
            DataRequirementId::new("spy_prices"),
            DataRequirementId::new("totally_unknown_thing"),
            DataRequirementId::new("risk_free_rate"),
        ];
        let results = registry.check_availability(&ids);
        assert_eq!(results.len(), 3);
        assert!(results[0].1.available);
        assert!(!results[1].1.available);
        assert!(results[2].1.available);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = DataRegistry::new();
        let source = DataSource {
            id: "spy_prices".to_string(),
            name: "SPY".to_string(),
            data_type: "equity_prices".to_string(),
            is_auto_recognized: false,
            availability: BTreeMap::new(),
        };
        registry.register(source.clone()).expect("first registration");
        let err = registry.register(source).unwrap_err();
        assert!(matches!(err, DataRegistryError::AlreadyRegistered(_)));
    }
}
