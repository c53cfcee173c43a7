//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Sizing bounds: never negative, never past the leverage cap
//! 2. Drawdown bounds: always within [0, 1]
//! 3. Ratchet monotonicity: stops may only tighten, never loosen
//! 4. Run invariants on random series: position cap, cooldown spacing,
//!    capital accounting, nothing traded after a halt
//! 5. No lookahead: a prefix run reproduces the full run's early trades

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use replaylab_core::components::ConditionSignal;
use replaylab_core::domain::{Bar, BarSeries, Side};
use replaylab_core::engine::{run_backtest, EngineConfig, StopRule};
use replaylab_core::metrics::max_drawdown;
use replaylab_core::position_management::ratchet::ratchet;
use replaylab_core::sizers::fixed_fractional_notional;

// ── Strategies (proptest) ────────────────────────────────────────────

/// One bar step: close-to-close return, wick sizes, entry flags.
fn arb_step() -> impl Strategy<Value = (f64, f64, f64, bool, bool)> {
    (
        -0.04..0.04_f64,
        0.0..0.03_f64,
        0.0..0.03_f64,
        prop::bool::weighted(0.3),
        prop::bool::weighted(0.2),
    )
}

fn arb_series() -> impl Strategy<Value = BarSeries> {
    prop::collection::vec(arb_step(), 5..120).prop_map(|steps| {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut close = 100.0;
        let mut bars = Vec::with_capacity(steps.len());
        let mut long = Vec::with_capacity(steps.len());
        let mut short = Vec::with_capacity(steps.len());
        for (i, &(ret, up, down, l, s)) in steps.iter().enumerate() {
            let open = close;
            close *= 1.0 + ret;
            let high = open.max(close) * (1.0 + up);
            let low = open.min(close) * (1.0 - down);
            bars.push(Bar::new(t0 + Duration::hours(i as i64), open, high, low, close, 100.0));
            long.push(l);
            short.push(s);
        }
        let mut series = BarSeries::new("BTCUSDT", "1h", bars).unwrap();
        series.insert_flag("long", long).unwrap();
        series.insert_flag("short", short).unwrap();
        series
    })
}

fn arb_config() -> impl Strategy<Value = EngineConfig> {
    (
        0.005..0.2_f64,
        0.005..0.08_f64,
        0.5..4.0_f64,
        0usize..6,
        1usize..4,
        prop::option::of(1usize..20),
        prop::option::of(0.5..2.0_f64),
    )
        .prop_map(|(risk, stop, reward, cooldown, max_pos, hold, be)| EngineConfig {
            risk_per_trade: risk,
            stop_rule: StopRule::Percent { pct: stop },
            take_profit_reward_ratio: reward,
            cooldown_bars: cooldown,
            max_positions: max_pos,
            max_holding_bars: hold,
            breakeven_r_trigger: be,
            circuit_breaker_fraction: 0.5,
            ..Default::default()
        })
}

fn signal() -> ConditionSignal {
    ConditionSignal::both("long", "short")
}

// ── 1. Sizing Bounds ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn notional_within_leverage_cap(
        equity in 0.0..1e7_f64,
        risk in 0.0..1.0_f64,
        stop in 0.001..0.5_f64,
        cost in 0.0..0.01_f64,
        leverage in 0.1..20.0_f64,
    ) {
        let n = fixed_fractional_notional(equity, risk, stop, cost, leverage);
        prop_assert!(n >= 0.0);
        prop_assert!(n <= equity * leverage + 1e-6);
        // Uncapped, the loss at the stop (with round-trip cost) equals the risk budget.
        if n < equity * leverage - 1e-6 {
            prop_assert!((n * (stop + 2.0 * cost) - equity * risk).abs() < 1e-6 * equity.max(1.0));
        }
    }
}

// ── 2. Drawdown Bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_is_a_fraction(curve in prop::collection::vec(1.0..1e6_f64, 0..200)) {
        let dd = max_drawdown(&curve);
        prop_assert!((0.0..=1.0).contains(&dd));
    }
}

// ── 3. Ratchet Monotonicity ──────────────────────────────────────────

proptest! {
    #[test]
    fn ratchet_never_loosens(
        start in 50.0..150.0_f64,
        proposals in prop::collection::vec(50.0..150.0_f64, 1..50),
        long in any::<bool>(),
    ) {
        let side = if long { Side::Long } else { Side::Short };
        let mut stop = start;
        for p in proposals {
            let next = ratchet(side, stop, p);
            match side {
                Side::Long => prop_assert!(next >= stop),
                Side::Short => prop_assert!(next <= stop),
            }
            stop = next;
        }
    }
}

// ── 4. Run Invariants ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn run_invariants_hold(series in arb_series(), cfg in arb_config()) {
        let r = run_backtest(&series, &cfg, &signal()).unwrap();

        prop_assert!(r.open_positions.len() <= cfg.max_positions);
        prop_assert_eq!(r.equity_curve.len(), r.bars_processed + 1);
        prop_assert!((0.0..=100.0).contains(&r.max_drawdown_pct));

        let booked: f64 = r.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((r.final_capital - (cfg.initial_capital + booked)).abs() < 1e-6);

        for t in &r.trades {
            prop_assert!(t.exit_index >= t.entry_index);
            prop_assert!(t.notional > 0.0);
        }

        if cfg.max_positions == 1 {
            for pair in r.trades.windows(2) {
                prop_assert!(pair[1].entry_index >= pair[0].exit_index + cfg.cooldown_bars);
            }
        }

        if let Some(halt) = r.halt_bar() {
            prop_assert!(r.trades.iter().all(|t| t.exit_index < halt));
            prop_assert!(r.open_positions.iter().all(|p| p.entry_index < halt));
        }
    }
}

// ── 5. No Lookahead ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prefix_run_matches_full_run(
        series in arb_series(),
        cfg in arb_config(),
        cut in 0.2..1.0_f64,
    ) {
        let k = ((series.len() as f64 * cut) as usize).max(1);
        let prefix = series.slice(0, k).unwrap();

        let full = run_backtest(&series, &cfg, &signal()).unwrap();
        let part = run_backtest(&prefix, &cfg, &signal()).unwrap();

        let early: Vec<_> = full.trades.iter().filter(|t| t.exit_index < k).cloned().collect();
        prop_assert_eq!(part.trades, early);
        let n = part.bars_processed;
        prop_assert_eq!(&part.equity_curve[..n], &full.equity_curve[..n]);
    }
}
