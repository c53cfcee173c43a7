//! Backtesting engine: validated config, entry/exit evaluation, bar loop.
//!
//! One engine covers every strategy variant: behavior differences live in
//! [`EngineConfig`] and the [`EntrySignal`](crate::components::EntrySignal)
//! chosen at construction.

pub mod config;
pub mod entries;
pub mod exits;
pub mod funding;
pub mod loop_runner;
pub mod state;

pub use config::{
    ConfigError, EngineConfig, FundingConfig, SizingMode, StopRule, TrailingConfig,
    CONFIG_SCHEMA_VERSION,
};
pub use entries::{plan_entry, EntryPlan, EntryRejection};
pub use exits::{check_exit, realize, ExitFill};
pub use loop_runner::{run_backtest, run_backtest_cancellable, Backtest, EngineError};
pub use state::{EngineState, EntryStats, HaltReason, RunResult, Termination};
