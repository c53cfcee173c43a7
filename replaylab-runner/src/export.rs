//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! A single run produces:
//! - **result.json**: full `BacktestResult` with schema versioning
//! - **trades.csv** / **equity.csv**: trade tape and equity curve
//! - **report.md**: human-readable summary
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use replaylab_core::domain::{BarSeries, ExitKind, TradeRecord};

use crate::fitness::FitnessMetric;
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape, one row per closed trade.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "exit_kind",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "notional",
        "return_pct",
        "fees",
        "funding",
        "pnl",
        "capital_after",
        "bars_held",
        "r_multiple",
    ])?;
    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side),
            t.exit_kind.as_str().to_string(),
            t.entry_index.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_index.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            format!("{:.2}", t.notional),
            format!("{:.4}", t.return_fraction * 100.0),
            format!("{:.4}", t.fees),
            format!("{:.4}", t.funding),
            format!("{:.4}", t.pnl),
            format!("{:.2}", t.capital_after),
            t.bars_held.to_string(),
            format!("{:.3}", t.r_multiple),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity curve with `point` and `equity` columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["point", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Raw OHLCV bars in the layout `CsvSource` reads back.
pub fn export_bars_csv(series: &BarSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for b in series.bars() {
        wtr.write_record([
            b.timestamp.to_rfc3339(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Sweep leaderboard, best first by `metric`.
pub fn export_sweep_csv(results: &SweepResults, metric: FitnessMetric) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "run_id",
        "risk_per_trade",
        "stop_rule",
        "reward_ratio",
        "cooldown_bars",
        "trades",
        "total_return_pct",
        "monthly_return_pct",
        "max_drawdown_pct",
        "win_rate_pct",
        "profit_factor",
        "score",
    ])?;
    for (rank, r) in results.ranked(metric).into_iter().enumerate() {
        let e = &r.config.engine;
        let m = &r.result;
        wtr.write_record([
            (rank + 1).to_string(),
            r.short_id().to_string(),
            e.risk_per_trade.to_string(),
            serde_json::to_string(&e.stop_rule).context("failed to serialize stop rule")?,
            e.take_profit_reward_ratio.to_string(),
            e.cooldown_bars.to_string(),
            m.trade_count.to_string(),
            format!("{:.2}", m.total_return_pct),
            format!("{:.2}", m.monthly_return_pct),
            format!("{:.2}", m.max_drawdown_pct),
            format!("{:.1}", m.win_rate_pct),
            format!("{:.2}", m.profit_factor),
            format!("{:.4}", metric.score(m)),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir`; re-running the
/// same config overwrites the same directory. Returns its path.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", result.result.symbol, result.short_id());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("result.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.result.trades)?),
        ("equity.csv", export_equity_csv(&result.result.equity_curve)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Markdown summary of a single run.
pub fn generate_report(result: &BacktestResult) -> String {
    let r = &result.result;
    let s = &r.stats;
    let mut report = format!(
        "# Backtest Report\n\n\
## Run\n\n\
| Field | Value |\n\
| --- | --- |\n\
| Symbol | {} ({}) |\n\
| Signal | {} |\n\
| Run ID | {} |\n\
| Dataset Hash | {} |\n\
| Bars | {} simulated from index {} ({:.1} days) |\n\
| Termination | {:?} |\n",
        r.symbol,
        r.timeframe,
        result.signal,
        result.run_id,
        result.dataset_hash,
        r.bars_processed,
        r.first_bar_index,
        r.elapsed_days,
        r.termination
    );
    if result.synthetic {
        report.push_str("| Data | **SYNTHETIC** |\n");
    }

    report.push_str(&format!(
        "\n## Performance\n\n\
| Metric | Value |\n\
| --- | --- |\n\
| Initial Capital | {:.2} |\n\
| Final Capital | {:.2} |\n\
| Total Return | {:.2}% |\n\
| Monthly Return | {:.2}% |\n\
| Max Drawdown | {:.2}% |\n\
| Trades | {} |\n\
| Win Rate | {:.1}% |\n\
| Avg Win / Loss | {:.3}% / {:.3}% |\n\
| Profit Factor | {:.2} |\n\
| Sharpe (per trade) | {:.2} |\n\
| Fees / Funding | {:.2} / {:.2} |\n",
        r.initial_capital,
        r.final_capital,
        r.total_return_pct,
        r.monthly_return_pct,
        r.max_drawdown_pct,
        r.trade_count,
        r.win_rate_pct,
        r.avg_win_pct,
        r.avg_loss_pct,
        r.profit_factor,
        s.sharpe,
        s.total_fees,
        s.total_funding
    ));

    report.push_str("\n## Exits\n\n| Kind | Count |\n| --- | --- |\n");
    for kind in ExitKind::ALL {
        report.push_str(&format!("| {} | {} |\n", kind, s.exit_count(kind)));
    }

    let e = &r.entry_stats;
    report.push_str(&format!(
        "\n## Entries\n\n{} long / {} short signals, {} entries, {} instant stops.\n",
        e.long_signals, e.short_signals, e.entries, e.instant_stops
    ));
    let rejected =
        e.rejected_daily_limit + e.rejected_zero_size + e.rejected_invalid_stop + e.rejected_unfillable;
    if rejected > 0 {
        report.push_str(&format!(
            "Rejected: {} daily limit, {} zero size, {} invalid stop, {} unfillable.\n",
            e.rejected_daily_limit, e.rejected_zero_size, e.rejected_invalid_stop, e.rejected_unfillable
        ));
    }
    if !r.open_positions.is_empty() {
        report.push_str(&format!(
            "\n{} position(s) left open (unrealized).\n",
            r.open_positions.len()
        ));
    }
    report
}
