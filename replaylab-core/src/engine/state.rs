//! Mutable run state and the run result.

use crate::domain::{Account, Position, TradeRecord};
use crate::metrics::TradeStats;
use serde::{Deserialize, Serialize};

/// Why a run stopped taking trades early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// Capital fell below the circuit-breaker fraction of initial capital.
    Ruin,
    /// Drawdown from peak exceeded the configured limit.
    DrawdownLimit,
}

/// How the bar loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    #[default]
    Completed,
    Halted { reason: HaltReason, bar_index: usize },
    Cancelled { bar_index: usize },
}

/// Counters for the entry path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStats {
    pub long_signals: usize,
    pub short_signals: usize,
    pub entries: usize,
    pub instant_stops: usize,
    pub rejected_daily_limit: usize,
    pub rejected_zero_size: usize,
    pub rejected_invalid_stop: usize,
    /// Signal-supplied price outside the bar's range.
    pub rejected_unfillable: usize,
}

/// Mutable state that evolves bar-by-bar during the loop.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub account: Account,
    pub positions: Vec<Position>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<f64>,
    pub entry_stats: EntryStats,
    pub termination: Termination,
}

impl EngineState {
    pub fn new(initial_capital: f64, expected_bars: usize) -> Self {
        Self {
            account: Account::new(initial_capital),
            positions: Vec::new(),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(expected_bars + 1),
            entry_stats: EntryStats::default(),
            termination: Termination::Completed,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }

    /// Append a realized trade and book it.
    pub fn book(&mut self, mut trade: TradeRecord) {
        self.account.apply_pnl(trade.pnl);
        self.account.record_exit(trade.exit_index);
        trade.capital_after = self.account.capital;
        self.trades.push(trade);
    }
}

/// Output of a completed (or halted / cancelled) backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub symbol: String,
    pub timeframe: String,

    // ── Headline ──
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_pct: f64,
    pub monthly_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub profit_factor: f64,

    // ── Detail ──
    pub stats: TradeStats,
    pub entry_stats: EntryStats,
    pub trades: Vec<TradeRecord>,
    /// Capital at the start of each processed bar, then one closing point.
    pub equity_curve: Vec<f64>,
    /// Positions still open when the loop ended (unrealized, not in capital).
    pub open_positions: Vec<Position>,

    // ── Run ──
    pub termination: Termination,
    pub first_bar_index: usize,
    pub bars_processed: usize,
    pub elapsed_days: f64,
}

impl RunResult {
    pub fn halted(&self) -> bool {
        matches!(self.termination, Termination::Halted { .. })
    }

    /// Bar index where a halt fired, if any.
    pub fn halt_bar(&self) -> Option<usize> {
        match self.termination {
            Termination::Halted { bar_index, .. } => Some(bar_index),
            _ => None,
        }
    }
}
