//! Equity and trade statistics: pure functions, no engine state.
//!
//! Drawdown and returns are fractions here; the run result converts the
//! headline figures to percentages.

use crate::domain::{ExitKind, TradeRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days per "month" for monthly normalization.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Annualization factor for per-trade Sharpe.
const SHARPE_PERIODS: f64 = 252.0;

// ─── Equity ─────────────────────────────────────────────────────────

/// Largest peak-to-trough decline as a fraction of the running peak.
///
/// Single forward pass. Returns 0.0 for empty or monotonically rising
/// curves. Non-positive peaks are skipped.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &v in equity_curve {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            worst = worst.max((peak - v) / peak);
        }
    }
    worst.min(1.0)
}

/// `(final - initial) / initial`; 0.0 for a non-positive initial.
pub fn total_return(initial: f64, final_capital: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_capital - initial) / initial
}

/// Return normalized to a 30-day month, as a fraction.
///
/// - simple:   `total_return * 30 / elapsed_days`
/// - compound: `(final / initial)^(30 / elapsed_days) - 1`
///
/// Returns 0.0 when `elapsed_days <= 0`. A wiped-out account compounds to -1.
pub fn monthly_return(initial: f64, final_capital: f64, elapsed_days: f64, compound: bool) -> f64 {
    if elapsed_days <= 0.0 || initial <= 0.0 {
        return 0.0;
    }
    if compound {
        if final_capital <= 0.0 {
            return -1.0;
        }
        (final_capital / initial).powf(DAYS_PER_MONTH / elapsed_days) - 1.0
    } else {
        total_return(initial, final_capital) * DAYS_PER_MONTH / elapsed_days
    }
}

// ─── Trades ─────────────────────────────────────────────────────────

/// Fraction of P&Ls that are strictly positive.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit / |gross loss|. 0.0 when there are no losing trades.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss <= 0.0 {
        return 0.0;
    }
    gross_profit / gross_loss
}

/// Mean / std of per-trade returns, times sqrt(252).
///
/// 0.0 with fewer than two trades or zero variance.
pub fn trade_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let m = mean(returns);
    let var = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    let std = var.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    m / std * SHARPE_PERIODS.sqrt()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Aggregate statistics over a trade list.
///
/// Average win / loss are net returns on notional (`pnl / notional`) over
/// the winning / losing subsets; a trade with zero P&L is neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub avg_win_return: f64,
    pub avg_loss_return: f64,
    pub profit_factor: f64,
    /// Mean P&L per trade in quote currency.
    pub expectancy: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    pub avg_r_multiple: f64,
    pub sharpe: f64,
    pub total_fees: f64,
    pub total_funding: f64,
    pub max_consecutive_losses: usize,
    pub exits: BTreeMap<ExitKind, usize>,
}

impl TradeStats {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let net_returns: Vec<f64> = trades.iter().map(net_return).collect();
        let win_returns: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_winner())
            .map(net_return)
            .collect();
        let loss_returns: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_loser())
            .map(net_return)
            .collect();

        let mut exits = BTreeMap::new();
        for t in trades {
            *exits.entry(t.exit_kind).or_insert(0) += 1;
        }

        let mut streak = 0;
        let mut max_streak = 0;
        for t in trades {
            if t.is_loser() {
                streak += 1;
                max_streak = max_streak.max(streak);
            } else {
                streak = 0;
            }
        }

        let n = trades.len() as f64;
        Self {
            trade_count: trades.len(),
            winners: win_returns.len(),
            losers: loss_returns.len(),
            win_rate: win_rate(&pnls),
            avg_win_return: mean(&win_returns),
            avg_loss_return: mean(&loss_returns),
            profit_factor: profit_factor(&pnls),
            expectancy: pnls.iter().sum::<f64>() / n,
            gross_profit: pnls.iter().filter(|&&p| p > 0.0).sum(),
            gross_loss: pnls.iter().filter(|&&p| p < 0.0).sum(),
            largest_win: pnls.iter().copied().fold(0.0, f64::max),
            largest_loss: pnls.iter().copied().fold(0.0, f64::min),
            avg_bars_held: trades.iter().map(|t| t.bars_held as f64).sum::<f64>() / n,
            avg_r_multiple: trades.iter().map(|t| t.r_multiple).sum::<f64>() / n,
            sharpe: trade_sharpe(&net_returns),
            total_fees: trades.iter().map(|t| t.fees).sum(),
            total_funding: trades.iter().map(|t| t.funding).sum(),
            max_consecutive_losses: max_streak,
            exits,
        }
    }

    pub fn exit_count(&self, kind: ExitKind) -> usize {
        self.exits.get(&kind).copied().unwrap_or(0)
    }
}

fn net_return(trade: &TradeRecord) -> f64 {
    if trade.notional <= 0.0 {
        return 0.0;
    }
    trade.pnl / trade.notional
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use chrono::{TimeZone, Utc};

    fn trade(pnl: f64, kind: ExitKind) -> TradeRecord {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TradeRecord {
            side: Side::Long,
            exit_kind: kind,
            entry_index: 0,
            entry_time: t,
            entry_price: 100.0,
            exit_index: 2,
            exit_time: t,
            exit_price: 100.0,
            notional: 1000.0,
            return_fraction: pnl / 1000.0,
            fees: 0.5,
            funding: 0.0,
            pnl,
            capital_after: 0.0,
            bars_held: 2,
            r_multiple: 0.0,
        }
    }

    #[test]
    fn drawdown_of_worked_curve() {
        let dd = max_drawdown(&[1000.0, 1100.0, 1050.0, 1200.0, 900.0]);
        assert!((dd - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rising_curve_has_no_drawdown() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn win_rate_and_profit_factor_of_worked_pnls() {
        let pnls = [50.0, -20.0, 30.0, -10.0];
        assert!((win_rate(&pnls) - 0.5).abs() < 1e-12);
        assert!((profit_factor(&pnls) - 80.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_zero_without_losses() {
        assert_eq!(profit_factor(&[10.0, 5.0]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn monthly_return_simple_vs_compound() {
        // +21% over 60 days.
        let simple = monthly_return(1000.0, 1210.0, 60.0, false);
        assert!((simple - 0.105).abs() < 1e-12);
        let compound = monthly_return(1000.0, 1210.0, 60.0, true);
        assert!((compound - 0.1).abs() < 1e-12);
        assert_eq!(monthly_return(1000.0, 1210.0, 0.0, true), 0.0);
    }

    #[test]
    fn sharpe_zero_for_identical_returns() {
        assert_eq!(trade_sharpe(&[0.01, 0.01, 0.01]), 0.0);
        assert_eq!(trade_sharpe(&[0.01]), 0.0);
        assert!(trade_sharpe(&[0.02, -0.01, 0.03]) > 0.0);
    }

    #[test]
    fn trade_stats_aggregate() {
        let trades = vec![
            trade(50.0, ExitKind::TakeProfit),
            trade(-20.0, ExitKind::StopLoss),
            trade(-10.0, ExitKind::StopLoss),
            trade(30.0, ExitKind::TimeExit),
        ];
        let s = TradeStats::from_trades(&trades);
        assert_eq!(s.trade_count, 4);
        assert_eq!(s.winners, 2);
        assert!((s.win_rate - 0.5).abs() < 1e-12);
        assert!((s.avg_win_return - 0.04).abs() < 1e-12);
        assert!((s.avg_loss_return + 0.015).abs() < 1e-12);
        assert!((s.expectancy - 12.5).abs() < 1e-12);
        assert_eq!(s.largest_loss, -20.0);
        assert_eq!(s.max_consecutive_losses, 2);
        assert_eq!(s.exit_count(ExitKind::StopLoss), 2);
        assert_eq!(s.exit_count(ExitKind::InstantStop), 0);
        assert!((s.total_fees - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_trade_list_is_all_zero() {
        assert_eq!(TradeStats::from_trades(&[]), TradeStats::default());
    }
}
