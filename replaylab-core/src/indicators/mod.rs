//! Feature conveniences: a small set of indicators the engine can attach
//! to a series when the data source did not provide them.
//!
//! The engine itself only reads named columns. These exist so synthetic data
//! and raw OHLCV files can be backtested without an external feature step.
//! Every indicator leaves `NaN` during its warmup.

pub mod atr;
pub mod channel;
pub mod volume;

pub use atr::Atr;
pub use channel::{breakout_conditions, BreakoutParams, PriorChannel};
pub use volume::VolumeRatio;

use crate::domain::{Bar, BarSeries, SeriesError};

/// Trait for indicators: full bar series in, same-length column out.
///
/// # Look-ahead guard
/// The value at bar t must depend only on bars `0..=t`.
pub trait Indicator: Send + Sync {
    /// Column name the output is stored under (e.g., "atr_14").
    fn name(&self) -> &str;

    /// Leading bars that stay `NaN`.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Compute each indicator and store it under its name.
pub fn augment(series: &mut BarSeries, indicators: &[&dyn Indicator]) -> Result<(), SeriesError> {
    for ind in indicators {
        let values = ind.compute(series.bars());
        series.insert_numeric(ind.name(), values)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                t0 + Duration::hours(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn augment_stores_under_indicator_name() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let mut s = BarSeries::new("BTCUSDT", "1h", bars).unwrap();
        let atr = Atr::new(2);
        augment(&mut s, &[&atr]).unwrap();
        assert!(s.has_column("atr_2"));
        assert!(s.numeric("atr_2", 0).unwrap().is_nan());
        assert!(s.numeric("atr_2", 4).unwrap().is_finite());
    }
}
