//! TradeRecord: a completed round trip, immutable once appended.

use super::position::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rule closed the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    StopLoss,
    TakeProfit,
    TimeExit,
    /// Stopped out on the entry bar itself.
    InstantStop,
    /// Closed at the final bar's close.
    EndOfData,
}

impl ExitKind {
    pub const ALL: [ExitKind; 5] = [
        ExitKind::StopLoss,
        ExitKind::TakeProfit,
        ExitKind::TimeExit,
        ExitKind::InstantStop,
        ExitKind::EndOfData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitKind::StopLoss => "stop_loss",
            ExitKind::TakeProfit => "take_profit",
            ExitKind::TimeExit => "time_exit",
            ExitKind::InstantStop => "instant_stop",
            ExitKind::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub exit_kind: ExitKind,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    // ── Size ──
    pub notional: f64,

    // ── PnL ──
    /// Directional price return, before costs.
    pub return_fraction: f64,
    /// Fees and slippage for both sides.
    pub fees: f64,
    pub funding: f64,
    /// Realized quote-currency P&L after fees and funding.
    pub pnl: f64,
    pub capital_after: f64,

    // ── Duration ──
    pub bars_held: usize,

    /// Exit move in units of the initial stop distance.
    pub r_multiple: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    pub fn holding_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_minutes() as f64 / 60.0
    }
}
