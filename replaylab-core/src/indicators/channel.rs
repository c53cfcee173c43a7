//! Prior-window price channel and breakout conditions.
//!
//! The channel at bar t covers bars `t-period..t` (the current bar excluded),
//! so "close breaks the channel" compares today against the preceding window.

use super::{Indicator, VolumeRatio};
use crate::domain::{Bar, BarSeries, SeriesError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBand {
    Upper,
    Lower,
}

/// Highest high (upper) or lowest low (lower) of the previous `period` bars.
#[derive(Debug, Clone)]
pub struct PriorChannel {
    period: usize,
    band: ChannelBand,
    name: String,
}

impl PriorChannel {
    pub fn upper(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            band: ChannelBand::Upper,
            name: format!("channel_high_{period}"),
        }
    }

    pub fn lower(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            band: ChannelBand::Lower,
            name: format!("channel_low_{period}"),
        }
    }
}

impl Indicator for PriorChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        for t in self.period..bars.len() {
            let window = &bars[t - self.period..t];
            out[t] = match self.band {
                ChannelBand::Upper => window.iter().map(|b| b.high).fold(f64::MIN, f64::max),
                ChannelBand::Lower => window.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            };
        }
        out
    }
}

/// Parameters for [`breakout_conditions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutParams {
    pub channel_period: usize,
    /// Minimum volume / rolling-mean volume; 0 disables the volume check.
    pub volume_threshold: f64,
    pub volume_period: usize,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self {
            channel_period: 20,
            volume_threshold: 1.5,
            volume_period: 20,
        }
    }
}

/// Attach `long_breakout` / `short_breakout` flag columns.
///
/// Long when the close exceeds the prior channel high with a volume spike;
/// short when it falls below the prior channel low with a volume spike.
pub fn breakout_conditions(series: &mut BarSeries, params: &BreakoutParams) -> Result<(), SeriesError> {
    let bars = series.bars();
    let upper = PriorChannel::upper(params.channel_period).compute(bars);
    let lower = PriorChannel::lower(params.channel_period).compute(bars);
    let vol = VolumeRatio::new(params.volume_period).compute(bars);

    let spike = |t: usize| params.volume_threshold <= 0.0 || vol[t] > params.volume_threshold;
    let long: Vec<bool> = bars
        .iter()
        .enumerate()
        .map(|(t, b)| b.close > upper[t] && spike(t))
        .collect();
    let short: Vec<bool> = bars
        .iter()
        .enumerate()
        .map(|(t, b)| b.close < lower[t] && spike(t))
        .collect();

    series.insert_flag("long_breakout", long)?;
    series.insert_flag("short_breakout", short)?;
    Ok(())
}
