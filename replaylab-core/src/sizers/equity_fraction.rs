//! Equity-fraction sizer: a fixed share of equity, levered.

use super::{Sizer, SizingRequest};

/// `notional = equity * fraction * max_leverage`, ignoring the stop distance.
///
/// With `fraction <= 1` the leverage cap holds automatically; larger
/// fractions are clamped to it.
#[derive(Debug, Clone, Copy)]
pub struct EquityFractionSizer {
    fraction: f64,
}

impl EquityFractionSizer {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }
}

impl Sizer for EquityFractionSizer {
    fn size(&self, request: &SizingRequest) -> f64 {
        if request.equity <= 0.0 || !request.equity.is_finite() || !self.fraction.is_finite() {
            return 0.0;
        }
        (request.equity * self.fraction * request.max_leverage)
            .clamp(0.0, request.leverage_cap())
    }

    fn name(&self) -> &str {
        "equity_fraction"
    }
}
