//! Seeded synthetic bars for development and tests.
//!
//! A bounded random walk from a start price. The RNG is seeded from the
//! configured seed and the symbol, so the same inputs always produce the
//! same bars and different symbols diverge.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use replaylab_core::domain::{Bar, BarSeries};

use crate::data_loader::{BarSource, LoadError};

/// Bar duration for a timeframe label like `15m`, `1h`, `4h`, `1d`.
pub fn timeframe_duration(timeframe: &str) -> Result<Duration, LoadError> {
    let bad = || LoadError::Timeframe(timeframe.to_string());
    let (split, _) = timeframe.char_indices().last().ok_or_else(bad)?;
    let (count, unit) = timeframe.split_at(split);
    let n: i64 = count.parse().map_err(|_| bad())?;
    if n <= 0 {
        return Err(bad());
    }
    match unit {
        "m" => Ok(Duration::minutes(n)),
        "h" => Ok(Duration::hours(n)),
        "d" => Ok(Duration::days(n)),
        "w" => Ok(Duration::weeks(n)),
        _ => Err(bad()),
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    bars: usize,
    start_price: f64,
    volatility: f64,
    start: DateTime<Utc>,
}

impl SyntheticSource {
    pub fn new(seed: u64, bars: usize) -> Self {
        Self {
            seed,
            bars,
            start_price: 30_000.0,
            volatility: 0.01,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    fn rng(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    pub fn generate(&self, symbol: &str, step: Duration) -> Vec<Bar> {
        let mut rng = self.rng(symbol);
        let vol = self.volatility;
        let mut price = self.start_price;
        let mut bars = Vec::with_capacity(self.bars);

        for i in 0..self.bars {
            let ret: f64 = rng.gen_range(-vol..vol);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 2.0));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 2.0));
            let mut volume: f64 = rng.gen_range(500.0..1_500.0);
            // Occasional spikes so volume-confirmed breakouts can fire.
            if rng.gen_bool(0.05) {
                volume *= 3.0;
            }
            bars.push(Bar::new(
                self.start + step * i as i32,
                open,
                high,
                low,
                close,
                volume,
            ));
            price = close;
        }
        bars
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, symbol: &str, timeframe: &str) -> Result<BarSeries, LoadError> {
        let step = timeframe_duration(timeframe)?;
        Ok(BarSeries::new(symbol, timeframe, self.generate(symbol, step))?)
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}
