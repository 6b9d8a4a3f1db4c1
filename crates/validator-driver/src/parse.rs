// crates/validator-driver/src/parse.rs
// ============================================================================
// Module: Output Parsing
// Description: Statistics-map and textual-fallback parsing of backtest output.
// Purpose: Turn engine output into WindowMetrics (C4 §4.4 output parsing).
// Dependencies: std::collections::HashMap
// ============================================================================

//! ## Overview
//! Results are parsed two ways, in priority order: a structured statistics
//! map from the remote API, or — if that is unavailable — a table-based
//! scan of the engine's textual output. Both feed the same lenient numeric
//! parser, so `"14.306%"`, `"$14,306.00"`, and `"14.306"` all yield the
//! same underlying value where the field's semantics call for it.

use std::collections::HashMap;

use crate::window::WindowMetrics;

const FIELD_SHARPE: &str = "Sharpe Ratio";
const FIELD_CAGR: &str = "Compounding Annual Return";
const FIELD_DRAWDOWN: &str = "Drawdown";
const FIELD_ALPHA: &str = "Alpha";
const FIELD_NET_PROFIT: &str = "Net Profit";
const FIELD_WIN_RATE: &str = "Win Rate";
const FIELD_TOTAL_ORDERS: &str = "Total Orders";

const KNOWN_FIELDS: &[&str] = &[
    FIELD_SHARPE,
    FIELD_CAGR,
    FIELD_DRAWDOWN,
    FIELD_ALPHA,
    FIELD_NET_PROFIT,
    FIELD_WIN_RATE,
    FIELD_TOTAL_ORDERS,
];

// ============================================================================
// SECTION: Lenient numeric parsing
// ============================================================================

/// Parses a loosely-formatted numeric string into a fraction.
///
/// Strips `$`, `,`, and surrounding whitespace. A trailing `%` divides the
/// parsed value by 100, so `"14.306%"` becomes `0.14306`.
#[must_use]
pub fn parse_lenient_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let is_percent = trimmed.ends_with('%');
    let cleaned: String = trimmed
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    Some(if is_percent { value / 100.0 } else { value })
}

// ============================================================================
// SECTION: Statistics-map parsing (remote API path)
// ============================================================================

/// Parses a statistics map (as returned by the remote engine API) into
/// [`WindowMetrics`]. Returns `None` when any required field is missing or
/// unparseable.
#[must_use]
pub fn parse_statistics_map(statistics: &HashMap<String, String>) -> Option<WindowMetrics> {
    let field = |name: &str| statistics.get(name).and_then(|raw| parse_lenient_number(raw));
    Some(WindowMetrics {
        sharpe: field(FIELD_SHARPE)?,
        cagr: field(FIELD_CAGR)?,
        max_drawdown: field(FIELD_DRAWDOWN)?,
        alpha: field(FIELD_ALPHA)?,
        net_profit: field(FIELD_NET_PROFIT)?,
        win_rate: field(FIELD_WIN_RATE)?,
        #[expect(clippy::cast_sign_loss, reason = "total orders is never negative")]
        total_trades: field(FIELD_TOTAL_ORDERS)? as u64,
    })
}

// ============================================================================
// SECTION: Table-based textual fallback
// ============================================================================

/// Parses the engine's tabular textual output into a statistics map, by
/// matching each known field label against the start of a line and taking
/// the remaining whitespace-delimited tail as the value.
#[must_use]
pub fn parse_table_output(text: &str) -> HashMap<String, String> {
    let mut statistics = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        for field in KNOWN_FIELDS {
            if let Some(rest) = trimmed.strip_prefix(field) {
                let value = rest.trim_start_matches([' ', '\t', ':', '|']).trim();
                if !value.is_empty() {
                    statistics.insert((*field).to_string(), value.to_string());
                }
            }
        }
    }
    statistics
}

/// Parses the engine's textual output directly into [`WindowMetrics`],
/// combining [`parse_table_output`] and [`parse_statistics_map`].
#[must_use]
pub fn parse_textual_fallback(text: &str) -> Option<WindowMetrics> {
    parse_statistics_map(&parse_table_output(text))
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
    fn parses_percent_strings_as_fractions() {
        assert!((parse_lenient_number("14.306%").expect("parsed") - 0.14306).abs() < 1e-9);
    }

    #[test]
    fn parses_dollar_and_comma_strings() {
        assert!((parse_lenient_number("$14,306.00").expect("parsed") - 14_306.0).abs() < 1e-9);
    }

    #[test]
    fn parses_plain_numbers() {
        assert!((parse_lenient_number("1.20").expect("parsed") - 1.20).abs() < 1e-9);
    }

    #[test]
    fn statistics_map_requires_every_field() {
        let mut statistics = HashMap::new();
        statistics.insert(FIELD_SHARPE.to_string(), "1.20".to_string());
        assert!(parse_statistics_map(&statistics).is_none());
    }

    #[test]
    fn statistics_map_parses_a_complete_set() {
        let mut statistics = HashMap::new();
        statistics.insert(FIELD_SHARPE.to_string(), "1.20".to_string());
        statistics.insert(FIELD_CAGR.to_string(), "12.0%".to_string());
        statistics.insert(FIELD_DRAWDOWN.to_string(), "14.0%".to_string());
        statistics.insert(FIELD_ALPHA.to_string(), "2.0%".to_string());
        statistics.insert(FIELD_NET_PROFIT.to_string(), "20.0%".to_string());
        statistics.insert(FIELD_WIN_RATE.to_string(), "55.0%".to_string());
        statistics.insert(FIELD_TOTAL_ORDERS.to_string(), "42".to_string());
        let metrics = parse_statistics_map(&statistics).expect("parsed");
        assert_eq!(metrics.total_trades, 42);
        assert!((metrics.cagr - 0.12).abs() < 1e-9);
    }

    #[test]
    fn table_output_extracts_known_fields_from_text() {
        let text = "Sharpe Ratio        1.20\nTotal Orders         42\nSome Other Line    ignored\n";
        let statistics = parse_table_output(text);
        assert_eq!(statistics.get(FIELD_SHARPE), Some(&"1.20".to_string()));
        assert_eq!(statistics.get(FIELD_TOTAL_ORDERS), Some(&"42".to_string()));
        assert_eq!(statistics.len(), 2);
    }
}
