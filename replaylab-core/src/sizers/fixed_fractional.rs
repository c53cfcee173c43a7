//! Fixed-fractional risk sizer with a leverage cap.

use super::{Sizer, SizingRequest};

/// Risk a fixed fraction of equity between entry and stop, costs included.
///
/// # Formula
/// ```text
/// max_loss = equity * risk_fraction
/// raw      = max_loss / (stop_distance_pct + 2 * cost_rate)
/// notional = min(raw, equity * max_leverage)
/// ```
///
/// # Example
/// - Equity: 10,000, risk 1% (100)
/// - Stop distance 1%, cost 0.05% per side
/// - raw = 100 / 0.011 = 9,090.9; cap at 3x = 30,000 → 9,090.9
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedFractionalSizer;

impl Sizer for FixedFractionalSizer {
    fn size(&self, request: &SizingRequest) -> f64 {
        fixed_fractional_notional(
            request.equity,
            request.risk_fraction,
            request.stop_distance_pct,
            request.cost_rate,
            request.max_leverage,
        )
    }

    fn name(&self) -> &str {
        "fixed_fractional"
    }
}

/// Free-function form of [`FixedFractionalSizer`].
///
/// Returns 0.0 for non-positive equity, a non-positive risk denominator, or
/// any non-finite input.
pub fn fixed_fractional_notional(
    equity: f64,
    risk_fraction: f64,
    stop_distance_pct: f64,
    cost_rate: f64,
    max_leverage: f64,
) -> f64 {
    let inputs = [equity, risk_fraction, stop_distance_pct, cost_rate, max_leverage];
    if inputs.iter().any(|v| !v.is_finite()) || equity <= 0.0 {
        return 0.0;
    }
    let denom = stop_distance_pct + 2.0 * cost_rate;
    if denom <= 0.0 {
        return 0.0;
    }
    let max_loss = equity * risk_fraction;
    let raw = max_loss / denom;
    raw.min(equity * max_leverage).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_example() {
        let n = fixed_fractional_notional(10_000.0, 0.01, 0.01, 0.0005, 3.0);
        assert!((n - 9_090.909_090).abs() < 1e-3);
    }

    #[test]
    fn leverage_cap_binds_on_tight_stops() {
        let n = fixed_fractional_notional(10_000.0, 0.02, 0.001, 0.0, 2.0);
        assert_eq!(n, 20_000.0);
    }

    #[test]
    fn zero_equity_sizes_to_zero() {
        assert_eq!(fixed_fractional_notional(0.0, 0.01, 0.01, 0.0, 3.0), 0.0);
        assert_eq!(fixed_fractional_notional(-5.0, 0.01, 0.01, 0.0, 3.0), 0.0);
    }

    #[test]
    fn degenerate_denominator_sizes_to_zero() {
        assert_eq!(fixed_fractional_notional(1000.0, 0.01, 0.0, 0.0, 3.0), 0.0);
        assert_eq!(fixed_fractional_notional(1000.0, 0.01, f64::NAN, 0.0, 3.0), 0.0);
    }
}
