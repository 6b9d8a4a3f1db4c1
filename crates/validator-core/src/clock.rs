// crates/validator-core/src/clock.rs
// ============================================================================
// Module: Clock
// Description: Explicit time injection for the orchestrator state machine.
// Purpose: Keep state transitions deterministic and replayable in tests.
// Dependencies: time
// ============================================================================

//! ## Overview
//! The orchestrator never reads wall-clock time directly; every transition
//! is timestamped by a [`Clock`] the caller supplies. [`SystemClock`] is the
//! production implementation; [`FixedClock`] pins a single instant for tests
//! and replays.

use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Supplies the current instant to the orchestrator.
pub trait Clock {
    /// Returns the instant to stamp the next state transition with.
    fn now(&self) -> OffsetDateTime;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock pinned to one instant, for deterministic tests and replay.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
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
    use time::macros::datetime;

    use super::*;

    #[test]
    fn fixed_clock_always_returns_the_same_instant() {
        let clock = FixedClock(datetime!(2026-01-01 00:00:00 UTC));
        assert_eq!(clock.now(), clock.now());
    }
}
