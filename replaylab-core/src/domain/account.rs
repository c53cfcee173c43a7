//! Account: realized equity, peak, and re-entry bookkeeping for one run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub capital: f64,
    pub initial_capital: f64,
    /// Monotonically non-decreasing.
    pub peak_capital: f64,
    /// Bar index of the most recent exit; `None` before the first exit.
    pub last_exit_index: Option<usize>,
    entry_day: Option<NaiveDate>,
    entries_on_day: u32,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            initial_capital,
            peak_capital: initial_capital,
            last_exit_index: None,
            entry_day: None,
            entries_on_day: 0,
        }
    }

    /// Book realized P&L and raise the peak if capital made a new high.
    pub fn apply_pnl(&mut self, pnl: f64) {
        self.capital += pnl;
        self.mark_peak();
    }

    pub fn mark_peak(&mut self) {
        if self.capital > self.peak_capital {
            self.peak_capital = self.capital;
        }
    }

    pub fn record_exit(&mut self, index: usize) {
        self.last_exit_index = Some(index);
    }

    /// True when at least `cooldown_bars` have passed since the last exit.
    pub fn cooldown_elapsed(&self, index: usize, cooldown_bars: usize) -> bool {
        match self.last_exit_index {
            Some(last) => index.saturating_sub(last) >= cooldown_bars,
            None => true,
        }
    }

    /// Fractional return on initial capital.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.capital - self.initial_capital) / self.initial_capital
    }

    /// Current drawdown from peak as a fraction in `[0, 1]` (while capital >= 0).
    pub fn drawdown_from_peak(&self) -> f64 {
        if self.peak_capital <= 0.0 {
            return 0.0;
        }
        ((self.peak_capital - self.capital) / self.peak_capital).max(0.0)
    }

    /// Entries already taken on `day`.
    pub fn entries_on(&self, day: NaiveDate) -> u32 {
        if self.entry_day == Some(day) {
            self.entries_on_day
        } else {
            0
        }
    }

    pub fn record_entry(&mut self, day: NaiveDate) {
        if self.entry_day == Some(day) {
            self.entries_on_day += 1;
        } else {
            self.entry_day = Some(day);
            self.entries_on_day = 1;
        }
    }
}
