//! ReplayLab Core: bar series, risk sizing, exit/entry evaluation, backtest driver.
//!
//! This crate contains the heart of the simulation engine:
//! - Domain types (bars, validated series, positions, trades, account)
//! - Fixed-fractional risk sizing with a leverage cap
//! - Exit evaluation in a fixed order: stop-loss, take-profit, time exit
//! - Breakeven / trailing stop adjustment under the ratchet invariant
//! - Cooldown-gated entries driven by a pluggable entry signal
//! - Equity, drawdown, and trade statistics

pub mod components;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod position_management;
pub mod sizers;

pub use components::{EntrySignal, Predictor};
pub use domain::{Bar, BarSeries, SeriesError};
pub use engine::{run_backtest, EngineConfig, EngineError, RunResult};
