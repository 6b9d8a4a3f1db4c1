// crates/validator-codegen/src/postprocess.rs
// ============================================================================
// Module: Post-processing Normalization
// Description: Idiom normalization applied uniformly to generated programs.
// Purpose: Smooth over the handful of API-naming mistakes both generation
//          paths are prone to, before a program is ever executed.
// Dependencies: (none)
// ============================================================================

//! ## Overview
//! Six normalization steps run in a fixed order over a generated program's
//! source text. Every step is textual and idempotent: applying the full
//! pipeline twice yields the same output as applying it once, since each
//! step only inserts or rewrites text that is itself a no-op to re-match.

// ============================================================================
// SECTION: Step tables
// ============================================================================

const REQUIRED_IMPORT: &str = "from AlgorithmImports import *";

/// snake_case host-API methods generation sometimes emits in PascalCase.
const METHOD_CASE_FIXUPS: &[(&str, &str)] = &[
    ("self.SetCash(", "self.set_cash("),
    ("self.SetWarmUp(", "self.set_warm_up("),
    ("self.SetStartDate(", "self.set_start_date("),
    ("self.SetEndDate(", "self.set_end_date("),
    ("self.AddEquity(", "self.add_equity("),
    ("self.SetBenchmark(", "self.set_benchmark("),
];

/// PascalCase option-chain filter methods generation sometimes emits in
/// snake_case.
const OPTION_FILTER_CASE_FIXUPS: &[(&str, &str)] = &[
    ("set_filter(", "SetFilter("),
    ("strikes(", "Strikes("),
    ("expiration(", "Expiration("),
];

/// `Resolution` enum cases, which the host API requires uppercase.
const RESOLUTION_CASES: &[(&str, &str)] = &[
    ("Resolution.Daily", "Resolution.DAILY"),
    ("Resolution.Hour", "Resolution.HOUR"),
    ("Resolution.Minute", "Resolution.MINUTE"),
    ("Resolution.Second", "Resolution.SECOND"),
    ("Resolution.Tick", "Resolution.TICK"),
];

const OPTIONS_MARKERS: &[&str] = &["AddOption(", "OptionChainProvider", "SetFilter("];
const RAW_MODE_LINE: &str = "        self.UniverseSettings.DataNormalizationMode = DataNormalizationMode.RAW";

const BENCHMARK_LINE: &str = "        self.set_benchmark(\"SPY\")";
const CASH_ANCHOR: &str = "self.set_cash(";

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Runs the full post-processing pipeline over `source`.
#[must_use]
pub fn postprocess(source: &str) -> String {
    let mut out = source.to_string();
    out = step_a_prepend_import(&out);
    out = step_b_method_case(&out);
    out = step_c_resolution_case(&out);
    out = step_d_option_filter_case(&out);
    out = step_e_raw_mode(&out);
    out = step_f_benchmark(&out);
    out
}

/// (a) Prepends the required import if the program does not already have it.
fn step_a_prepend_import(source: &str) -> String {
    if source.contains(REQUIRED_IMPORT) {
        return source.to_string();
    }
    format!("{REQUIRED_IMPORT}\n{source}")
}

/// (b) Rewrites known PascalCase host-API method calls to their snake_case
/// form.
fn step_b_method_case(source: &str) -> String {
    let mut out = source.to_string();
    for (from, to) in METHOD_CASE_FIXUPS {
        out = out.replace(from, to);
    }
    out
}

/// (c) Uppercases `Resolution` enum case references.
fn step_c_resolution_case(source: &str) -> String {
    let mut out = source.to_string();
    for (from, to) in RESOLUTION_CASES {
        out = out.replace(from, to);
    }
    out
}

/// (d) Rewrites known snake_case option-chain filter methods to their
/// PascalCase form.
fn step_d_option_filter_case(source: &str) -> String {
    let mut out = source.to_string();
    for (from, to) in OPTION_FILTER_CASE_FIXUPS {
        out = out.replace(from, to);
    }
    out
}

/// (e) Inserts raw-mode data-normalization when options APIs are used and
/// the normalization line is not already present.
fn step_e_raw_mode(source: &str) -> String {
    if source.contains(RAW_MODE_LINE) {
        return source.to_string();
    }
    if !OPTIONS_MARKERS.iter().any(|marker| source.contains(marker)) {
        return source.to_string();
    }
    insert_after_first_line_containing(source, "def Initialize", RAW_MODE_LINE)
}

/// (f) Injects a benchmark-set call immediately after the cash is set, when
/// no benchmark call is already present.
fn step_f_benchmark(source: &str) -> String {
    if source.contains("self.set_benchmark(") {
        return source.to_string();
    }
    if !source.contains(CASH_ANCHOR) {
        return source.to_string();
    }
    insert_after_first_line_containing(source, CASH_ANCHOR, BENCHMARK_LINE)
}

fn insert_after_first_line_containing(source: &str, needle: &str, insertion: &str) -> String {
    let mut out = String::with_capacity(source.len() + insertion.len() + 1);
    let mut inserted = false;
    for line in source.lines() {
        out.push_str(line);
        out.push('\n');
        if !inserted && line.contains(needle) {
            out.push_str(insertion);
            out.push('\n');
            inserted = true;
        }
    }
    out
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

    const SAMPLE: &str = "class Strat001(QCAlgorithm):\n    def Initialize(self):\n        self.SetCash(100000)\n        self.AddEquity(\"SPY\", Resolution.Daily)\n";

    #[test]
    fn prepends_missing_import() {
        let out = postprocess(SAMPLE);
        assert!(out.starts_with(REQUIRED_IMPORT));
    }

    #[test]
    fn does_not_duplicate_import_already_present() {
        let already = format!("{REQUIRED_IMPORT}\n{SAMPLE}");
        let out = postprocess(&already);
        assert_eq!(out.matches(REQUIRED_IMPORT).count(), 1);
    }

    #[test]
    fn fixes_pascal_case_method_and_resolution_case() {
        let out = postprocess(SAMPLE);
        assert!(out.contains("self.add_equity(\"SPY\", Resolution.DAILY)"));
        assert!(!out.contains("self.AddEquity("));
        assert!(!out.contains("Resolution.Daily"));
    }

    #[test]
    fn fixes_snake_case_option_filter_methods() {
        let with_filter = format!("{SAMPLE}        option.set_filter(-2, 2, 0, 30)\n");
        let out = postprocess(&with_filter);
        assert!(out.contains("option.SetFilter(-2, 2, 0, 30)"));
        assert!(!out.contains("option.set_filter("));
    }

    #[test]
    fn injects_benchmark_after_cash() {
        let out = postprocess(SAMPLE);
        assert!(out.contains(BENCHMARK_LINE));
    }

    #[test]
    fn inserts_raw_mode_only_when_options_apis_present() {
        let without_options = postprocess(SAMPLE);
        assert!(!without_options.contains("DataNormalizationMode"));

        let with_options = format!("{SAMPLE}        self.AddOption(\"SPY\")\n");
        let out = postprocess(&with_options);
        assert!(out.contains(RAW_MODE_LINE));
    }

    #[test]
    fn pipeline_is_idempotent() {
        let once = postprocess(SAMPLE);
        let twice = postprocess(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn pipeline_is_idempotent_with_options_apis() {
        let with_options = format!("{SAMPLE}        self.AddOption(\"SPY\")\n        self.SetFilter(-2, 2)\n");
        let once = postprocess(&with_options);
        let twice = postprocess(&once);
        assert_eq!(once, twice);
    }
}
