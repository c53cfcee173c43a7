//! Bar-by-bar driver: the heart of the backtesting engine.
//!
//! Per simulated bar:
//! 1. Cancellation check
//! 2. Record capital on the equity curve
//! 3. Circuit breakers (ruin, drawdown limit) → halt, no further trades
//! 4. Funding accrual on open positions
//! 5. Exits for every open position (stop adjustment, then stop / target / time)
//! 6. At most one entry, when below the position cap and past the cooldown
//!
//! After the loop the remaining positions are optionally closed at the last
//! close, and one closing equity point is appended.

use super::config::{ConfigError, EngineConfig};
use super::entries::{plan_entry, EntryRejection};
use super::exits::{check_exit, realize, ExitFill};
use super::funding::accrue;
use super::state::{EngineState, HaltReason, RunResult, Termination};
use crate::components::{BarContext, EntrySignal};
use crate::domain::series::elapsed_days;
use crate::domain::{BarSeries, ExitKind, SeriesError, Side};
use crate::metrics::{max_drawdown, monthly_return, total_return, TradeStats};
use crate::position_management::{adjust_stop, StopAdjuster};
use crate::sizers::{scaled_risk, Sizer};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures detected before the first bar is simulated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid bar series: {0}")]
    Series(#[from] SeriesError),

    #[error("warmup of {warmup} bars leaves nothing to simulate in a {len}-bar series")]
    WarmupTooLong { warmup: usize, len: usize },
}

/// Run a backtest to completion (or halt).
pub fn run_backtest(
    series: &BarSeries,
    config: &EngineConfig,
    signal: &dyn EntrySignal,
) -> Result<RunResult, EngineError> {
    Ok(Backtest::new(series, config, signal)?.run(None))
}

/// Like [`run_backtest`], but stops at the next bar once `cancel` is set and
/// returns the partial result.
pub fn run_backtest_cancellable(
    series: &BarSeries,
    config: &EngineConfig,
    signal: &dyn EntrySignal,
    cancel: &AtomicBool,
) -> Result<RunResult, EngineError> {
    Ok(Backtest::new(series, config, signal)?.run(Some(cancel)))
}

/// A validated, ready-to-run backtest.
pub struct Backtest<'a> {
    series: &'a BarSeries,
    config: &'a EngineConfig,
    signal: &'a dyn EntrySignal,
    sizer: Box<dyn Sizer>,
    adjusters: Vec<Box<dyn StopAdjuster>>,
}

impl<'a> Backtest<'a> {
    /// Validate config and series up front; nothing runs on failure.
    pub fn new(
        series: &'a BarSeries,
        config: &'a EngineConfig,
        signal: &'a dyn EntrySignal,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if series.is_empty() {
            return Err(SeriesError::Empty.into());
        }
        if config.warmup_bars >= series.len() {
            return Err(EngineError::WarmupTooLong {
                warmup: config.warmup_bars,
                len: series.len(),
            });
        }
        let mut required = config.required_columns();
        required.extend(signal.required_columns());
        series.require_columns(&required, config.warmup_bars)?;
        for name in config.optional_columns().into_iter().chain(signal.level_columns()) {
            if !series.has_column(&name) {
                return Err(SeriesError::MissingColumn { name }.into());
            }
        }

        Ok(Self {
            series,
            config,
            signal,
            sizer: config.build_sizer(),
            adjusters: config.build_stop_adjusters(),
        })
    }

    /// Replace the sizer chosen by the config.
    pub fn with_sizer(mut self, sizer: Box<dyn Sizer>) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn run(&self, cancel: Option<&AtomicBool>) -> RunResult {
        let cfg = self.config;
        let start = cfg.warmup_bars;
        let n = self.series.len();
        let mut state = EngineState::new(cfg.initial_capital, n - start);
        let mut last_index = start;

        debug!(
            symbol = self.series.symbol(),
            signal = self.signal.name(),
            sizer = self.sizer.name(),
            bars = n - start,
            "starting backtest"
        );

        for t in start..n {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                info!(bar = t, "backtest cancelled");
                state.termination = Termination::Cancelled { bar_index: t };
                break;
            }
            last_index = t;
            let ctx = BarContext::new(self.series, t);

            state.equity_curve.push(state.account.capital);

            if let Some(reason) = self.breaker(&state) {
                warn!(
                    bar = t,
                    ?reason,
                    capital = state.account.capital,
                    "circuit breaker tripped, halting"
                );
                state.termination = Termination::Halted {
                    reason,
                    bar_index: t,
                };
                break;
            }

            if let Some(funding) = &cfg.funding {
                for pos in state.positions.iter_mut() {
                    accrue(pos, &ctx, funding);
                }
            }

            self.process_exits(&mut state, &ctx);
            self.process_entry(&mut state, &ctx);
        }

        if cfg.close_at_end && state.termination == Termination::Completed {
            let ctx = BarContext::new(self.series, last_index);
            let fill = ExitFill {
                kind: ExitKind::EndOfData,
                price: ctx.bar().close,
            };
            for pos in std::mem::take(&mut state.positions) {
                let trade = realize(&pos, fill, ctx.bar(), last_index, cfg.cost_rate());
                state.book(trade);
            }
        }

        state.equity_curve.push(state.account.capital);
        self.finish(state, start, last_index)
    }

    fn breaker(&self, state: &EngineState) -> Option<HaltReason> {
        let acct = &state.account;
        if acct.capital < self.config.circuit_breaker_fraction * acct.initial_capital {
            return Some(HaltReason::Ruin);
        }
        match self.config.max_drawdown_halt {
            Some(limit) if acct.drawdown_from_peak() > limit => Some(HaltReason::DrawdownLimit),
            _ => None,
        }
    }

    fn process_exits(&self, state: &mut EngineState, ctx: &BarContext<'_>) {
        let bar = ctx.bar();
        let t = ctx.index();
        let cost = self.config.cost_rate();
        let mut open = Vec::with_capacity(state.positions.len());

        for mut pos in std::mem::take(&mut state.positions) {
            pos.update_extremes(bar);
            if adjust_stop(&mut pos, bar, &self.adjusters, cost) {
                debug!(bar = t, stop = pos.stop, "stop adjusted");
            }
            match check_exit(&pos, bar, t, self.config.max_holding_bars) {
                Some(fill) => {
                    let trade = realize(&pos, fill, bar, t, cost);
                    debug!(
                        bar = t,
                        kind = %trade.exit_kind,
                        price = trade.exit_price,
                        pnl = trade.pnl,
                        "exit"
                    );
                    state.book(trade);
                }
                None => open.push(pos),
            }
        }
        state.positions = open;
    }

    fn process_entry(&self, state: &mut EngineState, ctx: &BarContext<'_>) {
        let cfg = self.config;
        let t = ctx.index();
        if state.positions.len() >= cfg.max_positions
            || !state.account.cooldown_elapsed(t, cfg.cooldown_bars)
        {
            return;
        }

        let Some(side) = self.signal.evaluate_entry(ctx).side() else {
            return;
        };
        match side {
            Side::Long => state.entry_stats.long_signals += 1,
            Side::Short => state.entry_stats.short_signals += 1,
        }

        let day = ctx.bar().timestamp.date_naive();
        if let Some(limit) = cfg.max_entries_per_day {
            if state.account.entries_on(day) >= limit {
                state.entry_stats.rejected_daily_limit += 1;
                return;
            }
        }

        let acct = &state.account;
        let equity = if cfg.compounding {
            acct.capital
        } else {
            acct.initial_capital.min(acct.capital)
        };
        let risk = scaled_risk(cfg.risk_per_trade, acct.total_return(), &cfg.risk_scaling);

        let plan = match plan_entry(ctx, side, self.signal, cfg, self.sizer.as_ref(), equity, risk) {
            Ok(plan) => plan,
            Err(rejection) => {
                let stats = &mut state.entry_stats;
                match rejection {
                    EntryRejection::InvalidStop => stats.rejected_invalid_stop += 1,
                    EntryRejection::ZeroSize => stats.rejected_zero_size += 1,
                    EntryRejection::Unfillable => stats.rejected_unfillable += 1,
                }
                debug!(bar = t, ?rejection, "entry rejected");
                return;
            }
        };

        state.account.record_entry(day);
        state.entry_stats.entries += 1;

        if cfg.instant_stop_check && plan.stopped_on_fill_bar(ctx.bar()) {
            let trade = plan.instant_stop_trade(ctx, cfg.cost_rate());
            debug!(bar = t, side = ?side, pnl = trade.pnl, "instant stop on entry bar");
            state.entry_stats.instant_stops += 1;
            state.book(trade);
            return;
        }

        debug!(
            bar = t,
            side = ?side,
            price = plan.price,
            stop = plan.stop,
            target = plan.target,
            notional = plan.notional,
            "entry"
        );
        state.positions.push(plan.into_position(ctx));
    }

    fn finish(&self, state: EngineState, start: usize, last_index: usize) -> RunResult {
        let cfg = self.config;
        let initial = cfg.initial_capital;
        let final_capital = state.account.capital;
        let bars_processed = match state.termination {
            Termination::Cancelled { bar_index } => bar_index - start,
            _ => last_index - start + 1,
        };
        let elapsed = match (self.series.bar(start), self.series.bar(last_index)) {
            (Some(first), Some(last)) if bars_processed > 0 => elapsed_days(first, last),
            _ => 0.0,
        };
        let stats = TradeStats::from_trades(&state.trades);
        let total = total_return(initial, final_capital);

        let result = RunResult {
            symbol: self.series.symbol().to_string(),
            timeframe: self.series.timeframe().to_string(),
            initial_capital: initial,
            final_capital,
            total_return_pct: total * 100.0,
            monthly_return_pct: monthly_return(initial, final_capital, elapsed, cfg.compounding)
                * 100.0,
            max_drawdown_pct: max_drawdown(&state.equity_curve) * 100.0,
            trade_count: stats.trade_count,
            win_rate_pct: stats.win_rate * 100.0,
            avg_win_pct: stats.avg_win_return * 100.0,
            avg_loss_pct: stats.avg_loss_return * 100.0,
            profit_factor: stats.profit_factor,
            stats,
            entry_stats: state.entry_stats,
            trades: state.trades,
            equity_curve: state.equity_curve,
            open_positions: state.positions,
            termination: state.termination,
            first_bar_index: start,
            bars_processed,
            elapsed_days: elapsed,
        };

        info!(
            symbol = %result.symbol,
            trades = result.trade_count,
            final_capital = result.final_capital,
            return_pct = result.total_return_pct,
            max_dd_pct = result.max_drawdown_pct,
            "backtest finished"
        );
        result
    }
}
