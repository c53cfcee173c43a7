//! Column-driven entry conditions.
//!
//! The feature collaborator precomputes per-bar long/short conditions as
//! columns; this signal just reads them. Optional columns supply an intrabar
//! entry price (e.g. a breakout level) and an explicit stop.

use super::{BarContext, EntryDecision, EntryLevels, EntrySignal};
use crate::domain::Side;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSignal {
    long_column: Option<String>,
    short_column: Option<String>,
    entry_price_columns: Option<(String, String)>,
    stop_columns: Option<(String, String)>,
}

impl ConditionSignal {
    pub fn new(long_column: Option<String>, short_column: Option<String>) -> Self {
        Self {
            long_column,
            short_column,
            entry_price_columns: None,
            stop_columns: None,
        }
    }

    /// Long-only: `long_column` drives entries, shorts never fire.
    pub fn long_only(long_column: impl Into<String>) -> Self {
        Self::new(Some(long_column.into()), None)
    }

    pub fn both(long_column: impl Into<String>, short_column: impl Into<String>) -> Self {
        Self::new(Some(long_column.into()), Some(short_column.into()))
    }

    /// Fill long entries at `long` and shorts at `short` instead of the close.
    pub fn with_entry_price_columns(
        mut self,
        long: impl Into<String>,
        short: impl Into<String>,
    ) -> Self {
        self.entry_price_columns = Some((long.into(), short.into()));
        self
    }

    /// Use explicit stop levels instead of the configured stop rule.
    pub fn with_stop_columns(mut self, long: impl Into<String>, short: impl Into<String>) -> Self {
        self.stop_columns = Some((long.into(), short.into()));
        self
    }

    fn is_set(&self, ctx: &BarContext<'_>, column: &Option<String>) -> bool {
        column
            .as_deref()
            .and_then(|c| ctx.flag(c))
            .unwrap_or(false)
    }
}

fn pick(side: Side, pair: &(String, String)) -> &str {
    match side {
        Side::Long => &pair.0,
        Side::Short => &pair.1,
    }
}

impl EntrySignal for ConditionSignal {
    fn name(&self) -> &str {
        "conditions"
    }

    fn required_columns(&self) -> Vec<String> {
        // Level columns may legitimately be NaN on bars where no entry fires.
        self.long_column
            .iter()
            .chain(self.short_column.iter())
            .cloned()
            .collect()
    }

    fn level_columns(&self) -> Vec<String> {
        self.entry_price_columns
            .iter()
            .chain(self.stop_columns.iter())
            .flat_map(|(long, short)| [long.clone(), short.clone()])
            .collect()
    }

    fn evaluate_entry(&self, ctx: &BarContext<'_>) -> EntryDecision {
        EntryDecision::from_conditions(
            self.is_set(ctx, &self.long_column),
            self.is_set(ctx, &self.short_column),
        )
    }

    fn entry_levels(&self, ctx: &BarContext<'_>, side: Side) -> EntryLevels {
        let read = |pair: &Option<(String, String)>| {
            pair.as_ref()
                .and_then(|p| ctx.numeric(pick(side, p)))
                .filter(|v| v.is_finite() && *v > 0.0)
        };
        EntryLevels {
            price: read(&self.entry_price_columns),
            stop: read(&self.stop_columns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, BarSeries};
    use chrono::{Duration, TimeZone, Utc};

    fn series() -> BarSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..3)
            .map(|i| Bar::new(t0 + Duration::hours(i), 100.0, 101.0, 99.0, 100.0, 1.0))
            .collect();
        let mut s = BarSeries::new("BTCUSDT", "1h", bars).unwrap();
        s.insert_flag("go_long", vec![false, true, true]).unwrap();
        s.insert_flag("go_short", vec![true, false, true]).unwrap();
        s.insert_numeric("brk_hi", vec![f64::NAN, 100.5, 100.8]).unwrap();
        s.insert_numeric("brk_lo", vec![99.5, f64::NAN, 99.2]).unwrap();
        s
    }

    #[test]
    fn reads_condition_columns_with_long_priority() {
        let s = series();
        let sig = ConditionSignal::both("go_long", "go_short");
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 0)), EntryDecision::Short);
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 1)), EntryDecision::Long);
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 2)), EntryDecision::Long);
    }

    #[test]
    fn long_only_ignores_short_column() {
        let s = series();
        let sig = ConditionSignal::long_only("go_long");
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 0)), EntryDecision::None);
        assert_eq!(sig.required_columns(), vec!["go_long".to_string()]);
    }

    #[test]
    fn entry_price_columns_select_by_side() {
        let s = series();
        let sig = ConditionSignal::both("go_long", "go_short")
            .with_entry_price_columns("brk_hi", "brk_lo");
        let ctx = BarContext::new(&s, 1);
        assert_eq!(sig.entry_levels(&ctx, Side::Long).price, Some(100.5));
        // NaN level → no override, fill at close.
        assert_eq!(sig.entry_levels(&ctx, Side::Short).price, None);
        assert_eq!(sig.entry_levels(&ctx, Side::Long).stop, None);
    }

    #[test]
    fn level_columns_list_both_sides() {
        let sig = ConditionSignal::both("go_long", "go_short")
            .with_entry_price_columns("brk_hi", "brk_lo")
            .with_stop_columns("sl_long", "sl_short");
        assert_eq!(
            sig.level_columns(),
            vec!["brk_hi", "brk_lo", "sl_long", "sl_short"]
        );
        assert!(ConditionSignal::long_only("go_long").level_columns().is_empty());
    }
}
