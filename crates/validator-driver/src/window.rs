// crates/validator-driver/src/window.rs
// ============================================================================
// Module: Window Types
// Description: A single walk-forward window and its backtest outcome.
// Purpose: Shared vocabulary between C4 (driver), C5 (correction), and C6.
// Dependencies: validator-ids, time, serde
// ============================================================================

//! ## Overview
//! A [`WindowSpec`] names one span of calendar time a generated program is
//! backtested over. Running it produces exactly one [`WindowOutcome`].

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use validator_ids::WindowId;

// ============================================================================
// SECTION: Window specification
// ============================================================================

/// One walk-forward window: an identifier and an inclusive calendar span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Window identifier, ordered within a schedule.
    pub id: WindowId,
    /// Inclusive start date.
    pub start: Date,
    /// Inclusive end date.
    pub end: Date,
}

impl WindowSpec {
    /// Builds a window spec from raw components.
    #[must_use]
    pub const fn new(id: WindowId, start: Date, end: Date) -> Self {
        Self { id, start, end }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Numeric results extracted from a successful backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Sharpe ratio.
    pub sharpe: f64,
    /// Compounding annual return (CAGR), as a fraction (0.12 == 12%).
    pub cagr: f64,
    /// Maximum drawdown, as a fraction.
    pub max_drawdown: f64,
    /// Alpha, as a fraction.
    pub alpha: f64,
    /// Net profit, as a fraction.
    pub net_profit: f64,
    /// Win rate, as a fraction.
    pub win_rate: f64,
    /// Total number of orders/trades placed.
    pub total_trades: u64,
}

/// Result of running one [`WindowSpec`] through the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowOutcome {
    /// Which window this outcome belongs to.
    pub window: WindowId,
    /// Whether the backtest is usable for aggregation.
    pub success: bool,
    /// The engine process itself crashed (permanent, not retryable).
    pub engine_crash: bool,
    /// The engine refused to accept work (transient, retryable upstream).
    pub rate_limited: bool,
    /// Human-readable reason, populated whenever `success` is false.
    #[serde(default)]
    pub reason: Option<String>,
    /// Parsed metrics, present only when `success` is true.
    #[serde(default)]
    pub metrics: Option<WindowMetrics>,
}

impl WindowOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub const fn success(window: WindowId, metrics: WindowMetrics) -> Self {
        Self {
            window,
            success: true,
            engine_crash: false,
            rate_limited: false,
            reason: None,
            metrics: Some(metrics),
        }
    }

    /// Builds a plain failure outcome (neither crash nor rate limit).
    #[must_use]
    pub const fn failure(window: WindowId, reason: String) -> Self {
        Self {
            window,
            success: false,
            engine_crash: false,
            rate_limited: false,
            reason: Some(reason),
            metrics: None,
        }
    }

    /// Builds an engine-crash outcome.
    #[must_use]
    pub const fn engine_crash(window: WindowId, reason: String) -> Self {
        Self {
            window,
            success: false,
            engine_crash: true,
            rate_limited: false,
            reason: Some(reason),
            metrics: None,
        }
    }

    /// Builds a rate-limited outcome.
    #[must_use]
    pub const fn rate_limited(window: WindowId, reason: String) -> Self {
        Self {
            window,
            success: false,
            engine_crash: false,
            rate_limited: true,
            reason: Some(reason),
            metrics: None,
        }
    }
}
