//! Backtest runner: wires data, features, strategy and engine together.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads and prepares data, then runs. Used by the CLI.
//! - `run_prepared()`: takes already prepared data. Used by sweeps so the
//!   series is loaded and featurized once.

use std::sync::atomic::AtomicBool;

use replaylab_core::domain::{BarSeries, SeriesError};
use replaylab_core::engine::{run_backtest, run_backtest_cancellable, EngineError, RunResult, StopRule};
use replaylab_core::indicators::{augment, Atr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{compute_dataset_hash, load_bars, LoadError, LoadedData};
use crate::strategy::{build_signal, prepare_features};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("feature error: {0}")]
    Series(#[from] SeriesError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    /// Name of the entry signal that drove the run.
    pub signal: String,
    /// Warmup actually applied (config warmup raised to cover feature lookbacks).
    pub warmup_bars: usize,
    pub config: RunConfig,
    pub result: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Leading 12 characters of a run ID, or all of it when shorter.
pub fn short_run_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

impl BacktestResult {
    /// Display prefix of `run_id`; also names the artifact directory.
    pub fn short_id(&self) -> &str {
        short_run_id(&self.run_id)
    }
}

/// A series ready for the engine: features attached, window applied.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub series: BarSeries,
    pub warmup_bars: usize,
    /// Hash of the raw loaded bars.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Load the configured data and prepare it.
pub fn load_prepared(config: &RunConfig) -> Result<PreparedData, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data)?;
    prepare(config, loaded)
}

/// Attach missing features, then cut the simulation window.
///
/// Features are computed on the full history so indicators are warm when
/// the window starts; any lookback still inside the window becomes warmup.
pub fn prepare(config: &RunConfig, loaded: LoadedData) -> Result<PreparedData, RunError> {
    let LoadedData {
        mut series,
        dataset_hash,
        synthetic,
    } = loaded;
    let mut lookback = config.strategy.lookback();

    if let StopRule::AtrMultiple { column, .. } = &config.engine.stop_rule {
        if !series.has_column(column) {
            let atr = Atr::new(config.data.atr_period).named(column.as_str());
            augment(&mut series, &[&atr])?;
            lookback = lookback.max(config.data.atr_period);
            debug!(column = %column, period = config.data.atr_period, "attached ATR column");
        }
    }
    prepare_features(&config.strategy, &mut series)?;

    let full_len = series.len();
    if let Some(days) = config.data.simulation_days {
        series = series.last_days(days)?;
    }
    let skipped = full_len - series.len();
    let warmup_bars = config.engine.warmup_bars.max(lookback.saturating_sub(skipped));

    Ok(PreparedData {
        series,
        warmup_bars,
        dataset_hash,
        synthetic,
    })
}

/// Run a single backtest from a RunConfig (loads data).
pub fn run_single_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    let data = load_prepared(config)?;
    run_prepared(config, &data, None)
}

/// Run a backtest on prepared data. No I/O.
///
/// `config.data` must describe the data that was prepared; only the engine
/// and strategy sections are read here.
pub fn run_prepared(
    config: &RunConfig,
    data: &PreparedData,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    let mut engine = config.engine.clone();
    engine.warmup_bars = data.warmup_bars;
    let signal = build_signal(&config.strategy);

    let result = match cancel {
        Some(flag) => run_backtest_cancellable(&data.series, &engine, signal.as_ref(), flag)?,
        None => run_backtest(&data.series, &engine, signal.as_ref())?,
    };

    let run_id = config.run_id()?;
    info!(
        run_id = short_run_id(&run_id),
        symbol = %result.symbol,
        signal = signal.name(),
        trades = result.trade_count,
        monthly_return_pct = result.monthly_return_pct,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: data.dataset_hash.clone(),
        synthetic: data.synthetic,
        signal: signal.name().to_string(),
        warmup_bars: data.warmup_bars,
        config: config.clone(),
        result,
    })
}

/// Run on an in-memory series (no source). The dataset hash is computed
/// from the series as given.
pub fn run_on_series(config: &RunConfig, series: BarSeries) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = LoadedData {
        dataset_hash: compute_dataset_hash(&series),
        synthetic: false,
        series,
    };
    let data = prepare(config, loaded)?;
    run_prepared(config, &data, None)
}
