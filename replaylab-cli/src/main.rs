//! ReplayLab CLI: run, sweep, and synthetic data commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `sweep`: run a parameter grid over one config and print a leaderboard
//! - `synth`: write a seeded synthetic OHLCV series as CSV
//!
//! Logging goes to stderr; `RUST_LOG` overrides the `-v` level.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replaylab_runner::data_loader::BarSource;
use replaylab_runner::{
    export_bars_csv, export_sweep_csv, run_single_backtest, save_artifacts, BacktestResult,
    FitnessMetric, ParamGrid, ParamSweep, RunConfig, SyntheticSource,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab CLI: bar-replay backtesting for crypto perpetuals"
)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the config's simulation window.
        #[arg(long)]
        days: Option<u32>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write nothing.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run a parameter grid over one config.
    Sweep {
        /// Path to a TOML config file (the grid's base point).
        #[arg(long)]
        config: PathBuf,

        /// Ranking metric.
        #[arg(long, default_value_t = FitnessMetric::MonthlyReturn)]
        metric: FitnessMetric,

        /// Leaderboard rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Risk per trade values (comma separated).
        #[arg(long, value_delimiter = ',')]
        risk: Vec<f64>,

        /// ATR stop multipliers.
        #[arg(long, value_delimiter = ',')]
        stop_mult: Vec<f64>,

        /// Take-profit reward ratios.
        #[arg(long, value_delimiter = ',')]
        reward: Vec<f64>,

        /// Cooldown bar counts.
        #[arg(long, value_delimiter = ',')]
        cooldown: Vec<usize>,

        /// Use the built-in crypto grid for axes not given explicitly.
        #[arg(long, default_value_t = false)]
        default_grid: bool,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write leaderboard.csv and the best run's artifacts here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write a seeded synthetic OHLCV series as CSV.
    Synth {
        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,

        #[arg(long, default_value = "15m")]
        timeframe: String,

        #[arg(long, default_value_t = 5_000)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 30_000.0)]
        start_price: f64,

        /// Max absolute close-to-close return per bar.
        #[arg(long, default_value_t = 0.01)]
        volatility: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            days,
            output_dir,
            no_save,
        } => run_cmd(&config, days, (!no_save).then_some(output_dir.as_path())),
        Commands::Sweep {
            config,
            metric,
            top,
            risk,
            stop_mult,
            reward,
            cooldown,
            default_grid,
            sequential,
            output_dir,
        } => {
            let mut grid = if default_grid {
                ParamGrid::default_crypto()
            } else {
                ParamGrid::default()
            };
            override_axis(&mut grid.risk_per_trade, risk);
            override_axis(&mut grid.stop_multipliers, stop_mult);
            override_axis(&mut grid.reward_ratios, reward);
            override_axis(&mut grid.cooldown_bars, cooldown);
            sweep_cmd(&config, &grid, metric, top, !sequential, output_dir.as_deref())
        }
        Commands::Synth {
            output,
            symbol,
            timeframe,
            bars,
            seed,
            start_price,
            volatility,
        } => {
            let source = SyntheticSource::new(seed, bars)
                .with_start_price(start_price)
                .with_volatility(volatility);
            synth_cmd(&source, &symbol, &timeframe, &output)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn override_axis<T>(axis: &mut Vec<T>, values: Vec<T>) {
    if !values.is_empty() {
        *axis = values;
    }
}

fn run_cmd(config_path: &Path, days: Option<u32>, output_dir: Option<&Path>) -> Result<()> {
    let mut config = RunConfig::from_file(config_path)?;
    if days.is_some() {
        config.data.simulation_days = days;
    }

    let result = run_single_backtest(&config)
        .with_context(|| format!("backtest failed for {}", config_path.display()))?;
    print_summary(&result);

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    grid: &ParamGrid,
    metric: FitnessMetric,
    top: usize,
    parallel: bool,
    output_dir: Option<&Path>,
) -> Result<()> {
    let base = RunConfig::from_file(config_path)?;
    info!(points = grid.size(&base), metric = %metric, "sweep grid");

    let results = ParamSweep::new()
        .with_parallelism(parallel)
        .sweep(grid, &base)?;

    println!();
    println!("=== Sweep: {} points, ranked by {metric} ===", results.len());
    println!(
        "{:>4} {:<12} {:>6} {:>16} {:>6} {:>4} {:>7} {:>9} {:>8} {:>12}",
        "#", "Run", "Risk", "Stop", "R:R", "CD", "Trades", "Monthly%", "MaxDD%", "Score"
    );
    println!("{}", "-".repeat(94));
    for (rank, r) in results.top_n(metric, top).into_iter().enumerate() {
        let e = &r.config.engine;
        println!(
            "{:>4} {:<12} {:>6.3} {:>16} {:>6.2} {:>4} {:>7} {:>9.2} {:>8.2} {:>12.4}",
            rank + 1,
            r.short_id(),
            e.risk_per_trade,
            stop_label(&e.stop_rule),
            e.take_profit_reward_ratio,
            e.cooldown_bars,
            r.result.trade_count,
            r.result.monthly_return_pct,
            r.result.max_drawdown_pct,
            metric.score(&r.result),
        );
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("leaderboard.csv");
        std::fs::write(&path, export_sweep_csv(&results, metric)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Leaderboard saved to: {}", path.display());
        if let Some(best) = results.best(metric) {
            let run_dir = save_artifacts(best, dir)?;
            println!("Best run saved to: {}", run_dir.display());
        }
    }
    Ok(())
}

fn synth_cmd(source: &SyntheticSource, symbol: &str, timeframe: &str, output: &Path) -> Result<()> {
    let series = source.load(symbol, timeframe)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(output, export_bars_csv(&series)?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} synthetic {timeframe} bars for {symbol} to {}",
        series.len(),
        output.display()
    );
    Ok(())
}

fn stop_label(rule: &replaylab_core::engine::StopRule) -> String {
    use replaylab_core::engine::StopRule;
    match rule {
        StopRule::AtrMultiple { column, multiplier } => format!("{multiplier}x {column}"),
        StopRule::Percent { pct } => format!("{:.2}%", pct * 100.0),
    }
}

fn print_summary(result: &BacktestResult) {
    let r = &result.result;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {} ({})", r.symbol, r.timeframe);
    println!("Signal:         {}", result.signal);
    println!("Run ID:         {}", result.short_id());
    println!(
        "Bars:           {} from index {} ({} warmup, {:.1} days)",
        r.bars_processed, r.first_bar_index, result.warmup_bars, r.elapsed_days
    );
    println!("Trades:         {}", r.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Final Capital:  {:.2}", r.final_capital);
    println!("Total Return:   {:.2}%", r.total_return_pct);
    println!("Monthly Return: {:.2}%", r.monthly_return_pct);
    println!("Max Drawdown:   {:.2}%", r.max_drawdown_pct);
    println!("Win Rate:       {:.1}%", r.win_rate_pct);
    println!("Avg Win/Loss:   {:.3}% / {:.3}%", r.avg_win_pct, r.avg_loss_pct);
    println!("Profit Factor:  {:.2}", r.profit_factor);
    println!("Sharpe:         {:.3}", r.stats.sharpe);
    if let Some(bar) = r.halt_bar() {
        println!();
        println!("HALTED at bar {bar}: {:?}", r.termination);
    }
    if !r.open_positions.is_empty() {
        println!("Open positions: {} (unrealized)", r.open_positions.len());
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
