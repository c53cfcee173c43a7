//! Fitness function: configurable metric selector for ranking runs.

use std::fmt;
use std::str::FromStr;

use replaylab_core::engine::RunResult;
use serde::{Deserialize, Serialize};

/// Which metric to sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    #[default]
    MonthlyReturn,
    TotalReturn,
    ProfitFactor,
    WinRate,
    Sharpe,
    MaxDrawdown,
    /// Total return divided by max drawdown.
    ReturnOverDrawdown,
}

impl FitnessMetric {
    pub const ALL: [FitnessMetric; 7] = [
        Self::MonthlyReturn,
        Self::TotalReturn,
        Self::ProfitFactor,
        Self::WinRate,
        Self::Sharpe,
        Self::MaxDrawdown,
        Self::ReturnOverDrawdown,
    ];

    /// Extract the metric so that higher is always better.
    ///
    /// Drawdown is negated. Non-finite values map to `-inf` so they sort last.
    pub fn score(&self, r: &RunResult) -> f64 {
        let v = match self {
            Self::MonthlyReturn => r.monthly_return_pct,
            Self::TotalReturn => r.total_return_pct,
            Self::ProfitFactor => r.profit_factor,
            Self::WinRate => r.win_rate_pct,
            Self::Sharpe => r.stats.sharpe,
            Self::MaxDrawdown => -r.max_drawdown_pct,
            Self::ReturnOverDrawdown => {
                if r.max_drawdown_pct > 0.0 {
                    r.total_return_pct / r.max_drawdown_pct
                } else {
                    r.total_return_pct
                }
            }
        };
        if v.is_finite() {
            v
        } else {
            f64::NEG_INFINITY
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthlyReturn => "monthly_return",
            Self::TotalReturn => "total_return",
            Self::ProfitFactor => "profit_factor",
            Self::WinRate => "win_rate",
            Self::Sharpe => "sharpe",
            Self::MaxDrawdown => "max_drawdown",
            Self::ReturnOverDrawdown => "return_over_drawdown",
        }
    }
}

impl fmt::Display for FitnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown metric '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
