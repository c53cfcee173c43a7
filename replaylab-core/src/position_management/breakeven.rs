//! Breakeven stop: once the trade is N R in profit, lock in a fee-covering exit.

use super::StopAdjuster;
use crate::domain::{Bar, Position, Side};

/// Moves the stop to `entry * (1 ± 2 * cost_rate)` once the bar's favorable
/// extreme reaches `trigger_r` R-multiples.
///
/// The favorable extreme is the bar high for longs and the bar low for
/// shorts, so the trigger can fire on the same bar that later hits the new
/// stop.
#[derive(Debug, Clone, Copy)]
pub struct Breakeven {
    trigger_r: f64,
}

impl Breakeven {
    pub fn new(trigger_r: f64) -> Self {
        Self { trigger_r }
    }
}

impl StopAdjuster for Breakeven {
    fn name(&self) -> &str {
        "breakeven"
    }

    fn propose(&self, position: &Position, bar: &Bar, cost_rate: f64) -> Option<f64> {
        let r = position.r_multiple(position.favorable_extreme(bar));
        if r < self.trigger_r {
            return None;
        }
        let level = match position.side {
            Side::Long => position.entry_price * (1.0 + 2.0 * cost_rate),
            Side::Short => position.entry_price * (1.0 - 2.0 * cost_rate),
        };
        Some(level)
    }
}
