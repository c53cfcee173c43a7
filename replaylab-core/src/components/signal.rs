//! Entry signals: decide whether to open long, short, or nothing at a bar.
//!
//! Signals are account-agnostic: they see bars and indicator columns up to the
//! current bar through [`BarContext`], never capital or open positions. The
//! engine asks a signal only when an entry is actually possible.

pub mod condition;

pub use condition::ConditionSignal;

use crate::domain::{Bar, BarSeries, Side};
use serde::{Deserialize, Serialize};

/// Read-only view of a series at one bar. Nothing after `index` is reachable.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    series: &'a BarSeries,
    index: usize,
}

impl<'a> BarContext<'a> {
    /// Panics if `index` is out of range.
    pub fn new(series: &'a BarSeries, index: usize) -> Self {
        assert!(index < series.len(), "bar index {index} out of range");
        Self { series, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bar(&self) -> &'a Bar {
        &self.series.bars()[self.index]
    }

    /// Bars `0..=index`.
    pub fn history(&self) -> &'a [Bar] {
        &self.series.bars()[..=self.index]
    }

    pub fn symbol(&self) -> &'a str {
        self.series.symbol()
    }

    /// Column value at the current bar.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.series.numeric(column, self.index)
    }

    /// Column value `bars_back` bars before the current bar.
    pub fn numeric_back(&self, column: &str, bars_back: usize) -> Option<f64> {
        let i = self.index.checked_sub(bars_back)?;
        self.series.numeric(column, i)
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        self.series.flag(column, self.index)
    }
}

/// Outcome of asking a signal at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDecision {
    #[default]
    None,
    Long,
    Short,
}

impl EntryDecision {
    pub fn side(self) -> Option<Side> {
        match self {
            EntryDecision::None => None,
            EntryDecision::Long => Some(Side::Long),
            EntryDecision::Short => Some(Side::Short),
        }
    }

    /// Resolve two directional conditions; long is checked first.
    pub fn from_conditions(long: bool, short: bool) -> Self {
        if long {
            EntryDecision::Long
        } else if short {
            EntryDecision::Short
        } else {
            EntryDecision::None
        }
    }
}

/// Optional price levels a signal can supply for its entry.
///
/// `price: None` fills at the bar close. A supplied price is an intrabar fill,
/// which makes the entry eligible for the same-bar stop check.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryLevels {
    pub price: Option<f64>,
    pub stop: Option<f64>,
}

/// Trait for entry signals.
pub trait EntrySignal: Send + Sync {
    /// Human-readable name (e.g., "conditions", "predictor").
    fn name(&self) -> &str;

    /// Columns that must be finite at every evaluated bar.
    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Columns that must exist but may hold NaN (e.g. entry or stop levels
    /// only defined on signal bars).
    fn level_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Evaluate at `ctx.index()`. Must only use data up to that bar.
    fn evaluate_entry(&self, ctx: &BarContext<'_>) -> EntryDecision;

    /// Entry price and stop overrides for a decision already taken.
    fn entry_levels(&self, _ctx: &BarContext<'_>, _side: Side) -> EntryLevels {
        EntryLevels::default()
    }
}

/// Never enters. Useful as a baseline and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignal;

impl EntrySignal for NullSignal {
    fn name(&self) -> &str {
        "null"
    }

    fn evaluate_entry(&self, _ctx: &BarContext<'_>) -> EntryDecision {
        EntryDecision::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series() -> BarSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..5)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(t0 + Duration::minutes(15 * i), c, c + 1.0, c - 1.0, c, 1.0)
            })
            .collect();
        let mut s = BarSeries::new("ETHUSDT", "15m", bars).unwrap();
        s.insert_numeric("x", vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        s
    }

    #[test]
    fn long_checked_before_short() {
        assert_eq!(EntryDecision::from_conditions(true, true), EntryDecision::Long);
        assert_eq!(EntryDecision::from_conditions(false, true), EntryDecision::Short);
        assert_eq!(EntryDecision::from_conditions(false, false), EntryDecision::None);
    }

    #[test]
    fn context_history_stops_at_current_bar() {
        let s = series();
        let ctx = BarContext::new(&s, 2);
        assert_eq!(ctx.history().len(), 3);
        assert_eq!(ctx.bar().close, 102.0);
        assert_eq!(ctx.numeric("x"), Some(2.0));
        assert_eq!(ctx.numeric_back("x", 2), Some(0.0));
        assert_eq!(ctx.numeric_back("x", 3), None);
    }

    #[test]
    fn null_signal_never_fires() {
        let s = series();
        for i in 0..s.len() {
            assert_eq!(NullSignal.evaluate_entry(&BarContext::new(&s, i)), EntryDecision::None);
        }
    }
}
