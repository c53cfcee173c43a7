//! Volume relative to its rolling mean.

use super::Indicator;
use crate::domain::Bar;

/// `volume[t] / mean(volume[t-period+1..=t])`.
///
/// A zero rolling mean yields `NaN`.
#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("volume_ratio_{period}"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        let mut sum = 0.0;
        for (t, bar) in bars.iter().enumerate() {
            sum += bar.volume;
            if t >= self.period {
                sum -= bars[t - self.period].volume;
            }
            if t + 1 >= self.period {
                let mean = sum / self.period as f64;
                if mean > 0.0 {
                    out[t] = bar.volume / mean;
                }
            }
        }
        out
    }
}
