//! Periodic funding accrual on open positions.

use super::config::FundingConfig;
use crate::components::BarContext;
use crate::domain::Position;

/// Charge funding on `position` if `ctx.index()` is a funding bar for it.
///
/// Funding bars are every `interval_bars` after entry. Returns the amount
/// charged (negative when the position receives funding).
pub fn accrue(position: &mut Position, ctx: &BarContext<'_>, funding: &FundingConfig) -> f64 {
    let held = position.bars_held(ctx.index());
    if held == 0 || held % funding.interval_bars != 0 {
        return 0.0;
    }
    let rate = funding
        .column
        .as_deref()
        .and_then(|c| ctx.numeric(c))
        .filter(|r| r.is_finite())
        .unwrap_or(funding.rate);
    let charge = position.side.sign() * position.notional * rate;
    position.funding_paid += charge;
    charge
}
