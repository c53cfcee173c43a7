//! Exit evaluation for one open position at one bar.
//!
//! Fixed order, first match wins:
//! 1. Stop-loss  (long: low < stop,    short: high > stop)   → fill at stop
//! 2. Take-profit (long: high > target, short: low < target) → fill at target
//! 3. Time exit  (bars held >= max_holding_bars)             → fill at close
//!
//! Stop adjustment (breakeven / trailing) runs before these checks, so a stop
//! tightened on this bar is tested against this bar's range.

use crate::domain::{Bar, ExitKind, Position, Side, TradeRecord};

/// Where and why a position leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub kind: ExitKind,
    pub price: f64,
}

pub fn check_exit(
    position: &Position,
    bar: &Bar,
    index: usize,
    max_holding_bars: Option<usize>,
) -> Option<ExitFill> {
    let (stop_hit, target_hit) = match position.side {
        Side::Long => (bar.low < position.stop, bar.high > position.target),
        Side::Short => (bar.high > position.stop, bar.low < position.target),
    };
    if stop_hit {
        return Some(ExitFill {
            kind: ExitKind::StopLoss,
            price: position.stop,
        });
    }
    if target_hit {
        return Some(ExitFill {
            kind: ExitKind::TakeProfit,
            price: position.target,
        });
    }
    if let Some(limit) = max_holding_bars {
        if position.bars_held(index) >= limit {
            return Some(ExitFill {
                kind: ExitKind::TimeExit,
                price: bar.close,
            });
        }
    }
    None
}

/// Build the trade record for closing `position` at `fill`.
///
/// `pnl = notional * return - notional * cost_rate * 2 - funding`.
/// `capital_after` is filled in when the trade is booked.
pub fn realize(
    position: &Position,
    fill: ExitFill,
    bar: &Bar,
    index: usize,
    cost_rate: f64,
) -> TradeRecord {
    let return_fraction = position.directional_return(fill.price);
    let fees = position.notional * cost_rate * 2.0;
    let pnl = position.notional * return_fraction - fees - position.funding_paid;
    TradeRecord {
        side: position.side,
        exit_kind: fill.kind,
        entry_index: position.entry_index,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_index: index,
        exit_time: bar.timestamp,
        exit_price: fill.price,
        notional: position.notional,
        return_fraction,
        fees,
        funding: position.funding_paid,
        pnl,
        capital_after: 0.0,
        bars_held: position.bars_held(index),
        r_multiple: position.r_multiple(fill.price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            1.0,
        )
    }

    fn long() -> Position {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Position::open(Side::Long, 100.0, 10, t, 1000.0, 95.0, 110.0)
    }

    fn short() -> Position {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Position::open(Side::Short, 100.0, 10, t, 1000.0, 105.0, 90.0)
    }

    #[test]
    fn stop_loss_wins_over_take_profit() {
        let fill = check_exit(&long(), &bar(100.0, 112.0, 90.0, 100.0), 11, None).unwrap();
        assert_eq!(fill.kind, ExitKind::StopLoss);
        assert_eq!(fill.price, 95.0);
    }

    #[test]
    fn touching_the_stop_is_not_a_breach() {
        assert_eq!(check_exit(&long(), &bar(100.0, 101.0, 95.0, 100.0), 11, None), None);
        assert_eq!(check_exit(&short(), &bar(100.0, 105.0, 99.0, 100.0), 11, None), None);
    }

    #[test]
    fn take_profit_fills_at_target() {
        let fill = check_exit(&long(), &bar(100.0, 110.5, 99.0, 110.2), 11, None).unwrap();
        assert_eq!(fill.kind, ExitKind::TakeProfit);
        assert_eq!(fill.price, 110.0);

        let fill = check_exit(&short(), &bar(100.0, 101.0, 89.0, 95.0), 11, None).unwrap();
        assert_eq!(fill.kind, ExitKind::TakeProfit);
        assert_eq!(fill.price, 90.0);
    }

    #[test]
    fn time_exit_at_close_after_limit() {
        let quiet = bar(100.0, 101.0, 99.0, 100.5);
        assert_eq!(check_exit(&long(), &quiet, 13, Some(4)), None);
        let fill = check_exit(&long(), &quiet, 14, Some(4)).unwrap();
        assert_eq!(fill.kind, ExitKind::TimeExit);
        assert_eq!(fill.price, 100.5);
    }

    #[test]
    fn realize_applies_round_trip_costs_and_funding() {
        let mut pos = long();
        pos.funding_paid = 1.5;
        let fill = ExitFill {
            kind: ExitKind::TakeProfit,
            price: 110.0,
        };
        let trade = realize(&pos, fill, &bar(100.0, 111.0, 99.0, 110.0), 14, 0.0005);
        assert!((trade.return_fraction - 0.1).abs() < 1e-12);
        assert!((trade.fees - 1.0).abs() < 1e-12);
        // 1000 * 0.1 - 1.0 - 1.5
        assert!((trade.pnl - 97.5).abs() < 1e-9);
        assert_eq!(trade.bars_held, 4);
        assert!((trade.r_multiple - 2.0).abs() < 1e-12);
    }

    #[test]
    fn short_stop_loss_is_negative() {
        let fill = check_exit(&short(), &bar(100.0, 106.0, 99.0, 104.0), 12, None).unwrap();
        let trade = realize(&short(), fill, &bar(100.0, 106.0, 99.0, 104.0), 12, 0.0);
        assert!((trade.pnl + 50.0).abs() < 1e-9);
        assert!(trade.is_loser());
    }
}
