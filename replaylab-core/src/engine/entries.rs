//! Entry planning: turn a signal decision into stop, target, and notional.
//!
//! Preconditions (capacity, cooldown) are checked by the driver before the
//! signal is asked. Everything here runs only after a signal fired.

use super::config::{EngineConfig, StopRule};
use crate::components::{BarContext, EntrySignal};
use crate::domain::{Bar, ExitKind, Position, Side, TradeRecord};
use crate::sizers::{Sizer, SizingRequest};

/// Why a fired signal did not produce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRejection {
    /// Stop distance missing, non-finite, or on the wrong side of entry.
    InvalidStop,
    /// Sizer returned nothing to trade.
    ZeroSize,
    /// Signal-supplied price lies outside the bar's range.
    Unfillable,
}

/// A fully specified entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryPlan {
    pub side: Side,
    pub price: f64,
    pub stop: f64,
    pub target: f64,
    pub notional: f64,
    /// Stop distance as a fraction of entry, after the floor.
    pub stop_pct: f64,
    /// Filled inside the bar rather than at its close.
    pub intrabar: bool,
}

impl EntryPlan {
    /// Whether the fill bar's own range already breaches the stop.
    pub fn stopped_on_fill_bar(&self, bar: &Bar) -> bool {
        self.intrabar
            && match self.side {
                Side::Long => bar.low <= self.stop,
                Side::Short => bar.high >= self.stop,
            }
    }

    pub fn into_position(self, ctx: &BarContext<'_>) -> Position {
        Position::open(
            self.side,
            self.price,
            ctx.index(),
            ctx.bar().timestamp,
            self.notional,
            self.stop,
            self.target,
        )
    }

    /// Trade record for an entry stopped out on its own bar.
    ///
    /// Loss is `notional * (stop_pct + 2 * cost_rate)`, the full risk budget
    /// when the leverage cap did not bind.
    pub fn instant_stop_trade(&self, ctx: &BarContext<'_>, cost_rate: f64) -> TradeRecord {
        let fees = self.notional * cost_rate * 2.0;
        let return_fraction = -self.stop_pct;
        let bar = ctx.bar();
        TradeRecord {
            side: self.side,
            exit_kind: ExitKind::InstantStop,
            entry_index: ctx.index(),
            entry_time: bar.timestamp,
            entry_price: self.price,
            exit_index: ctx.index(),
            exit_time: bar.timestamp,
            exit_price: self.stop,
            notional: self.notional,
            return_fraction,
            fees,
            funding: 0.0,
            pnl: self.notional * return_fraction - fees,
            capital_after: 0.0,
            bars_held: 0,
            r_multiple: -1.0,
        }
    }
}

/// Build an entry plan for `side` at `ctx`.
///
/// `equity` is the sizing base and `risk_fraction` the already-scaled risk.
pub fn plan_entry(
    ctx: &BarContext<'_>,
    side: Side,
    signal: &dyn EntrySignal,
    config: &EngineConfig,
    sizer: &dyn Sizer,
    equity: f64,
    risk_fraction: f64,
) -> Result<EntryPlan, EntryRejection> {
    let bar = ctx.bar();
    let levels = signal.entry_levels(ctx, side);

    let price = levels.price.unwrap_or(bar.close);
    if price < bar.low || price > bar.high {
        return Err(EntryRejection::Unfillable);
    }

    let explicit = levels.stop.filter(|&s| match side {
        Side::Long => s < price,
        Side::Short => s > price,
    });
    let raw_distance = match explicit {
        Some(stop) => (price - stop).abs(),
        None => match &config.stop_rule {
            StopRule::AtrMultiple { column, multiplier } => {
                ctx.numeric(column).unwrap_or(f64::NAN) * multiplier
            }
            StopRule::Percent { pct } => price * pct,
        },
    };
    if !raw_distance.is_finite() || raw_distance <= 0.0 {
        return Err(EntryRejection::InvalidStop);
    }

    let stop_pct = (raw_distance / price).max(config.min_stop_distance_pct);
    if stop_pct >= 1.0 {
        return Err(EntryRejection::InvalidStop);
    }
    let distance = stop_pct * price;
    let sign = side.sign();
    let stop = price - sign * distance;
    // An ATR stop wide enough can put a short target at or below zero; it is
    // then unreachable and the trade ends by stop, time, or end of data.
    let target = price + sign * distance * config.take_profit_reward_ratio;

    let notional = sizer.size(&SizingRequest {
        equity,
        risk_fraction,
        stop_distance_pct: stop_pct,
        cost_rate: config.cost_rate(),
        max_leverage: config.max_leverage,
    });
    if !notional.is_finite() || notional <= 0.0 {
        return Err(EntryRejection::ZeroSize);
    }

    Ok(EntryPlan {
        side,
        price,
        stop,
        target,
        notional,
        stop_pct,
        intrabar: levels.price.is_some(),
    })
}
