//! ReplayLab Runner: run configuration, bar sources, orchestration, sweeps.
//!
//! This crate builds on `replaylab-core` to provide:
//! - TOML run configs with content-addressed run IDs
//! - Bar sources: CSV files and seeded synthetic walks
//! - Single-run orchestration (features, simulation window, warmup)
//! - Parallel parameter sweeps ranked by a fitness metric
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod runner;
pub mod strategy;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, DataConfig, RunConfig, RunId, SourceConfig, StrategyConfig};
pub use data_loader::{load_bars, BarSource, CsvSource, LoadError, LoadedData};
pub use export::{export_bars_csv, export_sweep_csv, load_artifacts, save_artifacts};
pub use fitness::FitnessMetric;
pub use runner::{
    load_prepared, run_on_series, run_prepared, run_single_backtest, BacktestResult,
    PreparedData, RunError, SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
pub use synthetic::SyntheticSource;
