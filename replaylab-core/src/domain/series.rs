//! BarSeries: validated, time-ordered bars plus named indicator columns.
//!
//! Indicator columns are stored column-wise and aligned by bar index, so the
//! value of column `c` for bar `t` is `series.numeric(c, t)`. The engine reads
//! columns; it never writes them.

use super::bar::Bar;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation failures for bar series and their columns.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar series is empty")]
    Empty,

    #[error("timestamp at bar {index} is not strictly after the previous bar")]
    NonMonotonicTimestamp { index: usize },

    #[error("bar {index} has a non-finite OHLCV value")]
    NonFinite { index: usize },

    #[error("bar {index} has a non-positive price")]
    NonPositivePrice { index: usize },

    #[error("bar {index} violates low <= open, close <= high")]
    InvalidRange { index: usize },

    #[error("bar {index} has negative volume")]
    NegativeVolume { index: usize },

    #[error("column '{name}' has {actual} values, series has {expected} bars")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("required column '{name}' is missing")]
    MissingColumn { name: String },

    #[error("required column '{name}' has a non-finite value at bar {index}")]
    NonFiniteColumnValue { name: String, index: usize },
}

/// One indicator column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Column {
    Numeric(Vec<f64>),
    Flag(Vec<bool>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Flag(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, start: usize, end: usize) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(v[start..end].to_vec()),
            Column::Flag(v) => Column::Flag(v[start..end].to_vec()),
        }
    }
}

/// Ordered bar sequence for one symbol and timeframe.
///
/// Constructed through [`BarSeries::new`], which rejects empty input,
/// out-of-order timestamps, and malformed bars. Columns added afterwards must
/// match the bar count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    timeframe: String,
    bars: Vec<Bar>,
    columns: BTreeMap<String, Column>,
}

impl BarSeries {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        validate_bars(&bars)?;
        Ok(Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            bars,
            columns: BTreeMap::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    // ── Columns ──

    /// Attach or replace a column. Length must equal the bar count.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), SeriesError> {
        let name = name.into();
        if column.len() != self.bars.len() {
            return Err(SeriesError::ColumnLength {
                name,
                expected: self.bars.len(),
                actual: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn insert_numeric(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), SeriesError> {
        self.insert_column(name, Column::Numeric(values))
    }

    pub fn insert_flag(
        &mut self,
        name: impl Into<String>,
        values: Vec<bool>,
    ) -> Result<(), SeriesError> {
        self.insert_column(name, Column::Flag(values))
    }

    /// Builder-style [`insert_column`](Self::insert_column).
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, SeriesError> {
        self.insert_column(name, column)?;
        Ok(self)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Numeric value of a column at a bar. Flag columns read as 1.0 / 0.0.
    pub fn numeric(&self, name: &str, index: usize) -> Option<f64> {
        match self.columns.get(name)? {
            Column::Numeric(v) => v.get(index).copied(),
            Column::Flag(v) => v.get(index).map(|&b| if b { 1.0 } else { 0.0 }),
        }
    }

    /// Boolean value of a column at a bar. Numeric columns are true when
    /// finite and non-zero.
    pub fn flag(&self, name: &str, index: usize) -> Option<bool> {
        match self.columns.get(name)? {
            Column::Flag(v) => v.get(index).copied(),
            Column::Numeric(v) => v.get(index).map(|x| x.is_finite() && *x != 0.0),
        }
    }

    /// Check that every named column exists and holds finite values from
    /// `from` to the end of the series.
    pub fn require_columns<S: AsRef<str>>(
        &self,
        names: &[S],
        from: usize,
    ) -> Result<(), SeriesError> {
        for name in names {
            let name = name.as_ref();
            let column = self
                .columns
                .get(name)
                .ok_or_else(|| SeriesError::MissingColumn {
                    name: name.to_string(),
                })?;
            if let Column::Numeric(values) = column {
                if let Some(offset) = values.iter().skip(from).position(|v| !v.is_finite()) {
                    return Err(SeriesError::NonFiniteColumnValue {
                        name: name.to_string(),
                        index: from + offset,
                    });
                }
            }
        }
        Ok(())
    }

    // ── Windows ──

    /// Sub-series of bars `[start, end)` with columns sliced to match.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, SeriesError> {
        let end = end.min(self.bars.len());
        if start >= end {
            return Err(SeriesError::Empty);
        }
        Ok(Self {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            bars: self.bars[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), c.slice(start, end)))
                .collect(),
        })
    }

    /// Keep only the bars within the last `days` days of the series.
    ///
    /// A window reaching past the representable time range keeps every bar.
    pub fn last_days(&self, days: u32) -> Result<Self, SeriesError> {
        let last = self.bars.last().ok_or(SeriesError::Empty)?.timestamp;
        let start = Duration::try_days(i64::from(days))
            .and_then(|window| last.checked_sub_signed(window))
            .map_or(0, |cutoff| self.bars.partition_point(|b| b.timestamp < cutoff));
        self.slice(start, self.bars.len())
    }

    /// Span between the first and last bar in fractional days.
    pub fn elapsed_days(&self) -> f64 {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => elapsed_days(first, last),
            _ => 0.0,
        }
    }
}

/// Fractional days between two bars' timestamps.
pub fn elapsed_days(first: &Bar, last: &Bar) -> f64 {
    let span = last.timestamp - first.timestamp;
    span.num_milliseconds() as f64 / 86_400_000.0
}

fn validate_bars(bars: &[Bar]) -> Result<(), SeriesError> {
    if bars.is_empty() {
        return Err(SeriesError::Empty);
    }
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(SeriesError::NonFinite { index });
        }
        if bar.open <= 0.0 || bar.high <= 0.0 || bar.low <= 0.0 || bar.close <= 0.0 {
            return Err(SeriesError::NonPositivePrice { index });
        }
        if !bar.has_valid_range() {
            return Err(SeriesError::InvalidRange { index });
        }
        if bar.volume < 0.0 {
            return Err(SeriesError::NegativeVolume { index });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(SeriesError::NonMonotonicTimestamp { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(t0 + Duration::hours(i as i64), c, c + 1.0, c - 1.0, c, 10.0)
            })
            .collect()
    }

    #[test]
    fn empty_series_rejected() {
        assert_eq!(
            BarSeries::new("BTCUSDT", "1h", vec![]).unwrap_err(),
            SeriesError::Empty
        );
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let mut b = bars(3);
        b[2].timestamp = b[1].timestamp;
        assert_eq!(
            BarSeries::new("BTCUSDT", "1h", b).unwrap_err(),
            SeriesError::NonMonotonicTimestamp { index: 2 }
        );
    }

    #[test]
    fn inverted_range_rejected() {
        let mut b = bars(3);
        b[1].high = b[1].low - 1.0;
        assert_eq!(
            BarSeries::new("BTCUSDT", "1h", b).unwrap_err(),
            SeriesError::InvalidRange { index: 1 }
        );
    }

    #[test]
    fn negative_volume_rejected() {
        let mut b = bars(2);
        b[0].volume = -1.0;
        assert_eq!(
            BarSeries::new("BTCUSDT", "1h", b).unwrap_err(),
            SeriesError::NegativeVolume { index: 0 }
        );
    }

    #[test]
    fn column_length_must_match() {
        let mut s = BarSeries::new("BTCUSDT", "1h", bars(4)).unwrap();
        let err = s.insert_numeric("atr", vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, SeriesError::ColumnLength { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn required_column_nan_reported_only_after_start() {
        let mut s = BarSeries::new("BTCUSDT", "1h", bars(4)).unwrap();
        s.insert_numeric("atr", vec![f64::NAN, f64::NAN, 1.0, 1.0]).unwrap();
        assert!(s.require_columns(&["atr"], 2).is_ok());
        assert_eq!(
            s.require_columns(&["atr"], 1).unwrap_err(),
            SeriesError::NonFiniteColumnValue {
                name: "atr".into(),
                index: 1
            }
        );
        assert!(matches!(
            s.require_columns(&["rsi"], 0).unwrap_err(),
            SeriesError::MissingColumn { .. }
        ));
    }

    #[test]
    fn flag_and_numeric_views_interconvert() {
        let mut s = BarSeries::new("BTCUSDT", "1h", bars(2)).unwrap();
        s.insert_flag("long", vec![true, false]).unwrap();
        s.insert_numeric("score", vec![0.0, 2.5]).unwrap();
        assert_eq!(s.numeric("long", 0), Some(1.0));
        assert_eq!(s.flag("score", 0), Some(false));
        assert_eq!(s.flag("score", 1), Some(true));
        assert_eq!(s.flag("missing", 0), None);
    }

    #[test]
    fn last_days_trims_leading_bars_and_columns() {
        let mut s = BarSeries::new("BTCUSDT", "1h", bars(72)).unwrap();
        s.insert_numeric("idx", (0..72).map(|i| i as f64).collect()).unwrap();
        let tail = s.last_days(1).unwrap();
        // Last bar is hour 71; cutoff hour 47 is inclusive.
        assert_eq!(tail.len(), 25);
        assert_eq!(tail.numeric("idx", 0), Some(47.0));
        assert!((tail.elapsed_days() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn last_days_beyond_time_range_keeps_everything() {
        let s = BarSeries::new("BTCUSDT", "1h", bars(10)).unwrap();
        assert_eq!(s.last_days(u32::MAX).unwrap().len(), 10);
        assert_eq!(s.last_days(1_000_000).unwrap().len(), 10);
    }
}
