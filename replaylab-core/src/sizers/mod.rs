//! Position Sizers: turn an equity base and stop distance into quote notional.
//!
//! Sizers are account-aware (they see equity) but signal-agnostic. Every
//! sizer honors the leverage cap: the result is always in
//! `[0, equity * max_leverage]`.

pub mod equity_fraction;
pub mod fixed_fractional;
pub mod scaling;

pub use equity_fraction::EquityFractionSizer;
pub use fixed_fractional::{fixed_fractional_notional, FixedFractionalSizer};
pub use scaling::{scaled_risk, RiskTier};

/// Inputs for one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    /// Equity base (current or initial capital, depending on compounding).
    pub equity: f64,
    /// Fraction of equity at risk if the stop is hit.
    pub risk_fraction: f64,
    /// Distance from entry to stop as a fraction of entry (already floored).
    pub stop_distance_pct: f64,
    /// Fee plus slippage, per side.
    pub cost_rate: f64,
    pub max_leverage: f64,
}

impl SizingRequest {
    pub fn leverage_cap(&self) -> f64 {
        self.equity * self.max_leverage
    }
}

/// Position sizing logic
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the signal's job)
/// - Sizers do NOT place stops (that's the entry evaluator's job)
pub trait Sizer: Send + Sync {
    /// Quote-currency notional for the request; 0.0 means "do not enter".
    fn size(&self, request: &SizingRequest) -> f64;

    /// Sizer name for logging
    fn name(&self) -> &str;
}
