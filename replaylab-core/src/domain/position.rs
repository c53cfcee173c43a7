//! Position: one open directional exposure.

use super::bar::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// Open position state, owned by a single run.
///
/// `notional` is quote-currency exposure; there is no share quantity. The
/// initial stop distance is frozen at entry and is the unit for R-multiples
/// even after the stop moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub notional: f64,
    pub stop: f64,
    pub target: f64,
    /// Price distance between entry and the initial stop.
    pub initial_stop_distance: f64,
    /// Highest high seen since entry (longs trail from this).
    pub highest_high: f64,
    /// Lowest low seen since entry (shorts trail from this).
    pub lowest_low: f64,
    /// Funding charged while open (negative when received).
    pub funding_paid: f64,
}

impl Position {
    pub fn open(
        side: Side,
        entry_price: f64,
        entry_index: usize,
        entry_time: DateTime<Utc>,
        notional: f64,
        stop: f64,
        target: f64,
    ) -> Self {
        debug_assert!(entry_price > 0.0 && notional > 0.0);
        Self {
            side,
            entry_price,
            entry_index,
            entry_time,
            notional,
            stop,
            target,
            initial_stop_distance: (entry_price - stop).abs(),
            highest_high: entry_price,
            lowest_low: entry_price,
            funding_paid: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    /// Signed price move from entry as a fraction of entry.
    pub fn directional_return(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }

    /// Favorable price move in units of the initial stop distance.
    pub fn r_multiple(&self, price: f64) -> f64 {
        if self.initial_stop_distance <= 0.0 {
            return 0.0;
        }
        self.side.sign() * (price - self.entry_price) / self.initial_stop_distance
    }

    /// Most favorable price reachable within `bar`.
    pub fn favorable_extreme(&self, bar: &Bar) -> f64 {
        match self.side {
            Side::Long => bar.high,
            Side::Short => bar.low,
        }
    }

    pub fn update_extremes(&mut self, bar: &Bar) {
        self.highest_high = self.highest_high.max(bar.high);
        self.lowest_low = self.lowest_low.min(bar.low);
    }

    pub fn bars_held(&self, index: usize) -> usize {
        index.saturating_sub(self.entry_index)
    }
}
