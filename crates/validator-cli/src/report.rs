// crates/validator-cli/src/report.rs
// ============================================================================
// Module: Output Helpers
// Description: Stdout/stderr line writers used for command progress output.
// Purpose: Give every command one place to write results through, so no
//          call site reaches for println!/eprintln! directly.
// Dependencies: std::io
// ============================================================================

//! ## Overview
//! Every command reports stage-by-stage progress as it moves a candidate
//! through the pipeline. These helpers write directly through
//! [`std::io::stdout`]/[`std::io::stderr`] handles rather than the
//! `println!`/`eprintln!` macros, so command output and error reporting stay
//! on separate, explicitly flushed streams.

use std::io::Write as _;

/// Writes one line to stdout, followed by a newline.
///
/// # Errors
///
/// Returns an error if the underlying write fails (a broken pipe, most commonly).
pub fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes one line to stderr, followed by a newline.
///
/// # Errors
///
/// Returns an error if the underlying write fails.
pub fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

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
    fn stdout_line_write_succeeds() {
        assert!(write_stdout_line("progress line").is_ok());
    }

    #[test]
    fn stderr_line_write_succeeds() {
        assert!(write_stderr_line("error line").is_ok());
    }
}
