// crates/validator-gate/src/schedule.rs
// ============================================================================
// Module: Window Schedules
// Description: Configured, non-dynamic walk-forward window sets.
// Purpose: Enumerate the window sets C6 can run (C6 §4.6 and its supplement).
// Dependencies: validator-driver::window, validator-ids, time
// ============================================================================

//! ## Overview
//! Window sets are fixed configuration, never computed dynamically from
//! market data. The five-window rolling schedule is the default; a
//! twelve-window rolling schedule is recorded as a selectable variant, per
//! the open question this spec leaves to the implementer.

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Month;
use validator_driver::WindowSpec;
use validator_ids::WindowId;

// ============================================================================
// SECTION: Schedule selection
// ============================================================================

/// A configured walk-forward window set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowSchedule {
    /// Single long span, 2012-01-01 through 2023-12-31.
    Single,
    /// Two windows: in-sample 2012-2017, out-of-sample 2018-2023.
    InSampleOutOfSample,
    /// Five rolling four-year spans. The default schedule.
    #[default]
    FiveWindowRolling,
    /// Twelve-window rolling schedule, recorded for future use; never
    /// selected unless explicitly configured.
    TwelveWindowRolling,
}

impl WindowSchedule {
    /// Builds the ordered list of windows for this schedule.
    #[must_use]
    pub fn windows(self) -> Vec<WindowSpec> {
        match self {
            WindowSchedule::Single => vec![window(1, 2012, 2023)],
            WindowSchedule::InSampleOutOfSample => vec![window(1, 2012, 2017), window(2, 2018, 2023)],
            WindowSchedule::FiveWindowRolling => vec![
                window(1, 2012, 2015),
                window(2, 2014, 2017),
                window(3, 2016, 2019),
                window(4, 2018, 2021),
                window(5, 2020, 2023),
            ],
            WindowSchedule::TwelveWindowRolling => (1..=12)
                .map(|n| {
                    let start_year = 2011 + n;
                    window(u32::try_from(n).unwrap_or(1), start_year, start_year + 1)
                })
                .collect(),
        }
    }
}

/// Builds a window spanning all of `start_year` through `end_year`.
///
/// `start_year`/`end_year` are schedule-internal constants in the
/// 2011-2024 range, so `from_calendar_date` never fails here.
#[expect(clippy::unwrap_used, reason = "schedule years are hardcoded and always in range")]
fn window(id: u32, start_year: i32, end_year: i32) -> WindowSpec {
    let start = Date::from_calendar_date(start_year, Month::January, 1).unwrap();
    let end = Date::from_calendar_date(end_year, Month::December, 31).unwrap();
    let id = WindowId::new(id.try_into().unwrap());
    WindowSpec::new(id, start, end)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
