//! Average True Range with Wilder smoothing.
//!
//! The first true range (no previous close) is skipped, so the seed is the
//! mean of TR[1..=period] and the first finite value lands at index `period`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    /// `period` of 0 is treated as 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }

    /// Store the output under `name` instead of `atr_{period}`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];
        if n <= self.period {
            return out;
        }
        let tr: Vec<f64> = bars
            .windows(2)
            .map(|w| w[1].true_range(Some(w[0].close)))
            .collect();
        // tr[k] belongs to bar k + 1.
        let p = self.period as f64;
        let mut atr = tr[..self.period].iter().sum::<f64>() / p;
        out[self.period] = atr;
        for (k, value) in tr.iter().enumerate().skip(self.period) {
            atr += (value - atr) / p;
            out[k + 1] = atr;
        }
        out
    }
}
