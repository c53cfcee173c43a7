//! Parameter sweep over engine settings.
//!
//! The series is loaded and featurized once; every grid point runs on the
//! same prepared data, in parallel with rayon.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use replaylab_core::engine::StopRule;

use crate::config::RunConfig;
use crate::fitness::FitnessMetric;
use crate::runner::{load_prepared, run_prepared, BacktestResult, PreparedData};

/// Parameter grid specification.
///
/// An empty axis keeps the base config's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGrid {
    pub risk_per_trade: Vec<f64>,
    /// Applied to `StopRule::AtrMultiple` multipliers; ignored for percent stops.
    pub stop_multipliers: Vec<f64>,
    pub reward_ratios: Vec<f64>,
    pub cooldown_bars: Vec<usize>,
}

fn axis<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl ParamGrid {
    /// A small default grid around typical settings.
    pub fn default_crypto() -> Self {
        Self {
            risk_per_trade: vec![0.005, 0.01, 0.02],
            stop_multipliers: vec![1.0, 1.5, 2.0],
            reward_ratios: vec![1.5, 2.0, 3.0],
            cooldown_bars: vec![0, 3],
        }
    }

    /// Returns the total number of configurations for `base`.
    pub fn size(&self, base: &RunConfig) -> usize {
        self.generate_configs(base).len()
    }

    /// Generates every configuration in the grid.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let e = &base.engine;
        let base_mult = match &e.stop_rule {
            StopRule::AtrMultiple { multiplier, .. } => Some(*multiplier),
            StopRule::Percent { .. } => None,
        };
        let mults: Vec<Option<f64>> = match base_mult {
            Some(m) => axis(&self.stop_multipliers, m).into_iter().map(Some).collect(),
            None => vec![None],
        };

        let mut configs = Vec::new();
        for &risk in &axis(&self.risk_per_trade, e.risk_per_trade) {
            for &mult in &mults {
                for &reward in &axis(&self.reward_ratios, e.take_profit_reward_ratio) {
                    for &cooldown in &axis(&self.cooldown_bars, e.cooldown_bars) {
                        let mut config = base.clone();
                        config.engine.risk_per_trade = risk;
                        config.engine.take_profit_reward_ratio = reward;
                        config.engine.cooldown_bars = cooldown;
                        if let (Some(m), StopRule::AtrMultiple { multiplier, .. }) =
                            (mult, &mut config.engine.stop_rule)
                        {
                            *multiplier = m;
                        }
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

/// Parameter sweep executor.
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load the base config's data once, then sweep.
    pub fn sweep(&self, grid: &ParamGrid, base: &RunConfig) -> Result<SweepResults> {
        let data = load_prepared(base).context("failed to prepare sweep data")?;
        self.sweep_prepared(grid, base, &data)
    }

    /// Sweep on data already prepared for `base`.
    pub fn sweep_prepared(
        &self,
        grid: &ParamGrid,
        base: &RunConfig,
        data: &PreparedData,
    ) -> Result<SweepResults> {
        let configs = grid.generate_configs(base);
        for c in &configs {
            c.validate()
                .with_context(|| format!("invalid grid point: {:?}", c.engine))?;
        }
        info!(points = configs.len(), parallel = self.parallel, "starting sweep");

        let run = |config: &RunConfig| {
            run_prepared(config, data, None).context("grid point failed")
        };
        let results: Vec<BacktestResult> = if self.parallel {
            configs.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            configs.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results sorted best-first by `metric`. Ties keep grid order.
    pub fn ranked(&self, metric: FitnessMetric) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| metric.score(&b.result).total_cmp(&metric.score(&a.result)));
        sorted
    }

    pub fn top_n(&self, metric: FitnessMetric, n: usize) -> Vec<&BacktestResult> {
        self.ranked(metric).into_iter().take(n).collect()
    }

    pub fn best(&self, metric: FitnessMetric) -> Option<&BacktestResult> {
        self.ranked(metric).into_iter().next()
    }
}
