// crates/validator-driver/src/rewriter.rs
// ============================================================================
// Module: Date Rewriter
// Description: Injects window dates into a generated program's source text.
// Purpose: Be the sole authority for window start/end dates (C4).
// Dependencies: crate::window, time
// ============================================================================

//! ## Overview
//! Generators never emit date-setting calls (see `validator_codegen::template`).
//! Before a window is executed, this rewriter strips any date-setting calls
//! already present — in either PascalCase or snake_case form, regardless of
//! origin — and inserts a canonical pair immediately after the algorithm's
//! `Initialize` method. Because the rewriter always produces the same
//! canonical form, running it twice with the same window is a fixed point.

use crate::window::WindowSpec;

const DATE_CALL_MARKERS: &[&str] = &["SetStartDate(", "set_start_date(", "SetEndDate(", "set_end_date("];
const INITIALIZE_MARKER: &str = "def Initialize(self):";

// ============================================================================
// SECTION: Rewriting
// ============================================================================

/// Rewrites `program` so its date-setting calls match `window`.
#[must_use]
pub fn rewrite_dates(program: &str, window: &WindowSpec) -> String {
    let stripped = strip_existing_date_calls(program);
    insert_canonical_date_calls(&stripped, window)
}

/// Removes every line containing a date-setting call, in any known form.
fn strip_existing_date_calls(program: &str) -> String {
    let mut out = String::with_capacity(program.len());
    for line in program.lines() {
        if DATE_CALL_MARKERS.iter().any(|marker| line.contains(marker)) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Inserts canonical PascalCase date calls right after `Initialize`.
fn insert_canonical_date_calls(program: &str, window: &WindowSpec) -> String {
    let start = format_date_args(window.start);
    let end = format_date_args(window.end);
    let mut out = String::with_capacity(program.len() + 96);
    let mut inserted = false;
    for line in program.lines() {
        out.push_str(line);
        out.push('\n');
        if !inserted && line.contains(INITIALIZE_MARKER) {
            out.push_str(&format!("        self.SetStartDate({start})\n"));
            out.push_str(&format!("        self.SetEndDate({end})\n"));
            inserted = true;
        }
    }
    out
}

/// Renders a date as `year, month, day` call arguments.
fn format_date_args(date: time::Date) -> String {
    format!("{}, {}, {}", date.year(), u8::from(date.month()), date.day())
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
    use time::Date;
    use time::Month;
    use validator_ids::WindowId;

    fn window() -> WindowSpec {
        WindowSpec::new(
            WindowId::new(1.try_into().expect("non-zero")),
            Date::from_calendar_date(2012, Month::January, 1).expect("valid date"),
            Date::from_calendar_date(2023, Month::December, 31).expect("valid date"),
        )
    }

    const PROGRAM: &str = "class Strat001(QCAlgorithm):\n    def Initialize(self):\n        self.SetCash(100000)\n";

    #[test]
    fn inserts_dates_when_absent() {
        let rewritten = rewrite_dates(PROGRAM, &window());
        assert!(rewritten.contains("self.SetStartDate(2012, 1, 1)"));
        assert!(rewritten.contains("self.SetEndDate(2023, 12, 31)"));
    }

    #[test]
    fn replaces_hardcoded_dates() {
        let hardcoded = "class Strat001(QCAlgorithm):\n    def Initialize(self):\n        self.set_start_date(1999, 1, 1)\n        self.set_end_date(1999, 12, 31)\n        self.SetCash(100000)\n";
        let rewritten = rewrite_dates(hardcoded, &window());
        assert!(!rewritten.contains("1999"));
        assert!(rewritten.contains("self.SetStartDate(2012, 1, 1)"));
    }

    #[test]
    fn is_a_fixed_point_on_repeated_application() {
        let once = rewrite_dates(PROGRAM, &window());
        let twice = rewrite_dates(&once, &window());
        assert_eq!(once, twice);
    }
}
