// crates/validator-data/src/pattern.rs
// ============================================================================
// Module: Native Pattern Recognizer
// Description: Recognizes logical data-requirement identifiers as natively available.
// Purpose: Avoid requiring a registry entry for a well-known universe of tickers.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Any identifier matching `<ticker>_<suffix>`, where the suffix is drawn
//! from a closed set and the ticker is short and alphanumeric, is treated as
//! available under the native tier without a registry entry. A second closed
//! set of special logical names (funding-rate and macro series the engine
//! ships natively) is always treated as native regardless of shape.

// ============================================================================
// SECTION: Closed sets
// ============================================================================

/// Suffixes that mark an identifier as a recognized native price series.
pub const NATIVE_SUFFIXES: [&str; 3] = ["_prices", "_data", "_ohlcv"];

/// Logical names that are always available under the native tier.
pub const NATIVE_SPECIAL_NAMES: [&str; 6] = [
    "risk_free_rate",
    "treasury_yields",
    "options_data",
    "futures_data",
    "forex_data",
    "crypto_data",
];

/// Maximum ticker length accepted by the native pattern.
const MAX_TICKER_LEN: usize = 6;

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a logical data-requirement identifier for lookup: lowercases
/// it and substitutes hyphens and spaces with underscores.
#[must_use]
pub fn normalize(id: &str) -> String {
    id.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

// ============================================================================
// SECTION: Recognizer
// ============================================================================

/// Returns true when the (already-normalized) identifier is recognized as
/// natively available, either as a special name or via the
/// `<ticker>_<suffix>` pattern.
#[must_use]
pub fn is_native_pattern(normalized_id: &str) -> bool {
    if NATIVE_SPECIAL_NAMES.contains(&normalized_id) {
        return true;
    }
    for suffix in NATIVE_SUFFIXES {
        let Some(ticker) = normalized_id.strip_suffix(suffix) else {
            continue;
        };
        if is_short_alphanumeric_ticker(ticker) {
            return true;
        }
    }
    false
}

fn is_short_alphanumeric_ticker(ticker: &str) -> bool {
    if ticker.is_empty() || ticker.len() > MAX_TICKER_LEN {
        return false;
    }
    let stripped: String = ticker.chars().filter(|c| *c != '_').collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Synthesizes the canonical ticker symbol for a recognized native pattern
/// identifier (uppercased, suffix stripped), or `None` if it is a special
/// name with no ticker component.
#[must_use]
pub fn ticker_symbol(normalized_id: &str) -> Option<String> {
    for suffix in NATIVE_SUFFIXES {
        if let Some(ticker) = normalized_id.strip_suffix(suffix) {
            if is_short_alphanumeric_ticker(ticker) {
                return Some(ticker.to_ascii_uppercase());
            }
        }
    }
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================
