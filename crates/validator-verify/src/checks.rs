// crates/validator-verify/src/checks.rs
// ============================================================================
// Module: Verification Checks
// Description: The seven structural checks run against a candidate.
// Purpose: Produce a deterministic Verification from a CandidateDocument.
// Dependencies: crate::candidate
// ============================================================================

//! ## Overview
//! Checks run in a fixed order and never short-circuit: every check
//! contributes at most one [`VerificationTest`], and the overall status is
//! the worst of the seven (fail beats warn beats pass).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::candidate::CandidateDocument;
use crate::candidate::UniverseType;

// ============================================================================
// SECTION: Closed keyword sets
// ============================================================================

/// Keywords whose presence anywhere in entry/exit text suggests look-ahead bias.
pub const LOOK_AHEAD_KEYWORDS: [&str; 10] = [
    "tomorrow",
    "next_day",
    "future",
    "will_be",
    "forward",
    "t+1",
    "t+2",
    "next_bar",
    "next_close",
    "tomorrow_open",
];

/// Keywords whose presence in the universe description suggests survivorship bias.
pub const SURVIVORSHIP_KEYWORDS: [&str; 7] = [
    "sp500",
    "s&p500",
    "index_constituents",
    "current_members",
    "top_",
    "largest_",
    "market_cap_rank",
];

// ============================================================================
// SECTION: Status and test result types
// ============================================================================

/// Outcome of a single check or of an overall [`Verification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Worst outcome: a mandatory field or structure is missing.
    Fail,
    /// A non-fatal concern was raised.
    Warn,
    /// No concerns.
    Pass,
    /// The check does not apply to this candidate.
    Skip,
}

impl VerificationStatus {
    fn severity_rank(self) -> u8 {
        match self {
            VerificationStatus::Fail => 0,
            VerificationStatus::Warn => 1,
            VerificationStatus::Skip | VerificationStatus::Pass => 2,
        }
    }
}

/// Result of a single structural check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationTest {
    /// Check name.
    pub name: String,
    /// Check outcome.
    pub status: VerificationStatus,
    /// Human-readable message.
    pub message: String,
    /// Structured detail (e.g. a list of keyword hits), when present.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// The full set of check results for one candidate, plus an overall status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Candidate this verification was run against.
    pub candidate_id: String,
    /// The seven check results, in the order they ran.
    pub tests: Vec<VerificationTest>,
    /// Worst-of-all-checks status: fail beats warn beats pass.
    pub overall_status: VerificationStatus,
}

impl Verification {
    /// Number of checks that passed.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.status == VerificationStatus::Pass)
            .count()
    }

    /// Number of checks that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.status == VerificationStatus::Fail)
            .count()
    }

    /// Number of checks that warned.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.status == VerificationStatus::Warn)
            .count()
    }
}

// ============================================================================
// SECTION: Entry point
// ============================================================================

/// Runs the seven structural checks against `candidate`, in order, and
/// computes the overall status.
#[must_use]
pub fn verify(candidate: &CandidateDocument) -> Verification {
    let tests = vec![
        check_look_ahead_bias(candidate),
        check_survivorship_bias(candidate),
        check_position_sizing(candidate),
        check_data_requirements(candidate),
        check_entry_defined(candidate),
        check_exit_defined(candidate),
        check_universe_defined(candidate),
    ];

    let overall_status = tests
        .iter()
        .map(|t| t.status)
        .min_by_key(|s| s.severity_rank())
        .unwrap_or(VerificationStatus::Pass);

    Verification {
        candidate_id: candidate.id.to_string(),
        tests,
        overall_status,
    }
}

// ============================================================================
// SECTION: Individual checks
// ============================================================================

/// Serializes `value` to JSON text and lowercases it, so a look-ahead
/// keyword anywhere in a nested field (not just the handful this crate
/// types directly) still surfaces.
fn serialized_lowercase(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default().to_ascii_lowercase()
}

fn check_look_ahead_bias(candidate: &CandidateDocument) -> VerificationTest {
    let mut haystack = String::new();
    if let Some(entry) = &candidate.entry {
        haystack.push_str(&serialized_lowercase(entry));
        haystack.push(' ');
    }
    if let Some(exit) = &candidate.exit {
        haystack.push_str(&serialized_lowercase(exit));
        haystack.push(' ');
    }

    let issues: Vec<&str> = LOOK_AHEAD_KEYWORDS
        .into_iter()
        .filter(|kw| haystack.contains(kw))
        .collect();

    if issues.is_empty() {
        VerificationTest {
            name: "look_ahead_bias".to_string(),
            status: VerificationStatus::Pass,
            message: "no look-ahead keywords found".to_string(),
            details: serde_json::Value::Null,
        }
    } else {
        VerificationTest {
            name: "look_ahead_bias".to_string(),
            status: VerificationStatus::Warn,
            message: format!("possible look-ahead bias: {}", issues.join(", ")),
            details: serde_json::json!({ "issues": issues }),
        }
    }
}

fn check_survivorship_bias(candidate: &CandidateDocument) -> VerificationTest {
    let Some(universe) = &candidate.universe else {
        return VerificationTest {
            name: "survivorship_bias".to_string(),
            status: VerificationStatus::Pass,
            message: "no universe to check".to_string(),
            details: serde_json::Value::Null,
        };
    };

    let mut issues = Vec::new();
    let symbols_joined = universe.symbols.join(" ").to_ascii_lowercase();
    let instruments_joined = universe.instruments.join(" ").to_ascii_lowercase();
    for kw in SURVIVORSHIP_KEYWORDS {
        if symbols_joined.contains(kw) || instruments_joined.contains(kw) {
            issues.push(format!("universe references '{kw}'"));
        }
    }

    if universe.universe_type == Some(UniverseType::Dynamic)
        && !universe.filters.iter().any(|f| f.contains("point_in_time"))
    {
        issues.push("dynamic universe without point-in-time flag".to_string());
    }

    if issues.is_empty() {
        VerificationTest {
            name: "survivorship_bias".to_string(),
            status: VerificationStatus::Pass,
            message: "no survivorship bias indicators".to_string(),
            details: serde_json::Value::Null,
        }
    } else {
        VerificationTest {
            name: "survivorship_bias".to_string(),
            status: VerificationStatus::Warn,
            message: issues.join("; "),
            details: serde_json::json!({ "issues": issues }),
        }
    }
}

fn check_position_sizing(candidate: &CandidateDocument) -> VerificationTest {
    let Some(position) = &candidate.position else {
        return VerificationTest {
            name: "position_sizing".to_string(),
            status: VerificationStatus::Warn,
            message: "no position descriptor present".to_string(),
            details: serde_json::Value::Null,
        };
    };
    let Some(sizing) = &position.sizing else {
        return VerificationTest {
            name: "position_sizing".to_string(),
            status: VerificationStatus::Warn,
            message: "no sizing descriptor present".to_string(),
            details: serde_json::Value::Null,
        };
    };
    if let Some(method) = &sizing.method {
        return VerificationTest {
            name: "position_sizing".to_string(),
            status: VerificationStatus::Pass,
            message: format!("sizing method: {method}"),
            details: serde_json::Value::Null,
        };
    }
    if sizing.size.is_some() || sizing.allocation.is_some() {
        return VerificationTest {
            name: "position_sizing".to_string(),
            status: VerificationStatus::Pass,
            message: "simple fixed sizing declared".to_string(),
            details: serde_json::Value::Null,
        };
    }
    VerificationTest {
        name: "position_sizing".to_string(),
        status: VerificationStatus::Warn,
        message: "sizing present but no method declared".to_string(),
        details: serde_json::Value::Null,
    }
}

fn check_data_requirements(candidate: &CandidateDocument) -> VerificationTest {
    let count = candidate
        .data_requirements
        .as_ref()
        .map_or(0, |r| r.primary.len());
    if count == 0 {
        VerificationTest {
            name: "data_requirements".to_string(),
            status: VerificationStatus::Warn,
            message: "no data requirements declared".to_string(),
            details: serde_json::Value::Null,
        }
    } else {
        VerificationTest {
            name: "data_requirements".to_string(),
            status: VerificationStatus::Pass,
            message: format!("{count} data requirement(s) declared"),
            details: serde_json::Value::Null,
        }
    }
}

fn check_entry_defined(candidate: &CandidateDocument) -> VerificationTest {
    let Some(entry) = &candidate.entry else {
        return VerificationTest {
            name: "entry_defined".to_string(),
            status: VerificationStatus::Fail,
            message: "no entry descriptor present".to_string(),
            details: serde_json::Value::Null,
        };
    };
    if entry.entry_type.is_none() {
        return VerificationTest {
            name: "entry_defined".to_string(),
            status: VerificationStatus::Warn,
            message: "entry descriptor has no type".to_string(),
            details: serde_json::Value::Null,
        };
    }
    let has_sub_config = entry.signals.is_some() || entry.technical.is_some() || entry.fundamental.is_some();
    if !has_sub_config {
        return VerificationTest {
            name: "entry_defined".to_string(),
            status: VerificationStatus::Warn,
            message: "entry type present but no signals/technical/fundamental config".to_string(),
            details: serde_json::Value::Null,
        };
    }
    VerificationTest {
        name: "entry_defined".to_string(),
        status: VerificationStatus::Pass,
        message: "entry fully defined".to_string(),
        details: serde_json::Value::Null,
    }
}

fn check_exit_defined(candidate: &CandidateDocument) -> VerificationTest {
    let Some(exit) = &candidate.exit else {
        return VerificationTest {
            name: "exit_defined".to_string(),
            status: VerificationStatus::Fail,
            message: "no exit descriptor present".to_string(),
            details: serde_json::Value::Null,
        };
    };
    if exit.paths.is_empty() {
        return VerificationTest {
            name: "exit_defined".to_string(),
            status: VerificationStatus::Warn,
            message: "exit paths list is empty".to_string(),
            details: serde_json::Value::Null,
        };
    }
    let has_stop = exit
        .paths
        .iter()
        .any(|p| p.to_ascii_lowercase().contains("stop"));
    if !has_stop {
        return VerificationTest {
            name: "exit_defined".to_string(),
            status: VerificationStatus::Warn,
            message: "no exit path mentions a stop".to_string(),
            details: serde_json::Value::Null,
        };
    }
    VerificationTest {
        name: "exit_defined".to_string(),
        status: VerificationStatus::Pass,
        message: format!("{} exit path(s) defined, includes a stop", exit.paths.len()),
        details: serde_json::Value::Null,
    }
}

fn check_universe_defined(candidate: &CandidateDocument) -> VerificationTest {
    let Some(universe) = &candidate.universe else {
        return VerificationTest {
            name: "universe_defined".to_string(),
            status: VerificationStatus::Fail,
            message: "no universe descriptor present".to_string(),
            details: serde_json::Value::Null,
        };
    };
    let Some(universe_type) = universe.universe_type else {
        return VerificationTest {
            name: "universe_defined".to_string(),
            status: VerificationStatus::Warn,
            message: "universe has no type".to_string(),
            details: serde_json::Value::Null,
        };
    };
    if universe_type == UniverseType::Static {
        let count = universe.symbols.len() + universe.instruments.len();
        if count == 0 {
            return VerificationTest {
                name: "universe_defined".to_string(),
                status: VerificationStatus::Warn,
                message: "static universe has no symbols or instruments".to_string(),
                details: serde_json::Value::Null,
            };
        }
        return VerificationTest {
            name: "universe_defined".to_string(),
            status: VerificationStatus::Pass,
            message: format!("static universe with {count} symbol(s)"),
            details: serde_json::Value::Null,
        };
    }
    VerificationTest {
        name: "universe_defined".to_string(),
        status: VerificationStatus::Pass,
        message: "dynamic universe declared".to_string(),
        details: serde_json::Value::Null,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
