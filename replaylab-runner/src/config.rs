//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! symbol = "BTCUSDT"
//! timeframe = "15m"
//! simulation_days = 30
//! source = { type = "csv", path = "data/btcusdt_15m.csv" }
//!
//! [engine]
//! risk_per_trade = 0.01
//! stop_rule = { type = "atr_multiple", column = "atr", multiplier = 1.5 }
//!
//! [strategy]
//! type = "breakout"
//! volume_threshold = 1.5
//! ```

use std::path::{Path, PathBuf};

use replaylab_core::engine::{ConfigError as EngineConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine config: {0}")]
    Engine(#[from] EngineConfigError),

    #[error("data config: {0}")]
    Data(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything needed to reproduce one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.data.validate()?;
        self.strategy.validate()
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

// ── Data ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    pub source: SourceConfig,
    /// Keep only the trailing window of this many days.
    #[serde(default)]
    pub simulation_days: Option<u32>,
    /// Period for the ATR column attached when the stop rule needs one
    /// and the source does not provide it.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
}

/// A century of bars is more than any exchange history.
pub const MAX_SIMULATION_DAYS: u32 = 36_500;

fn default_timeframe() -> String {
    "15m".into()
}

fn default_atr_period() -> usize {
    14
}

impl DataConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Data("symbol must not be empty".into()));
        }
        if self.atr_period == 0 {
            return Err(ConfigError::Data("atr_period must be > 0".into()));
        }
        if let Some(days) = self.simulation_days {
            if days == 0 || days > MAX_SIMULATION_DAYS {
                return Err(ConfigError::Data(format!(
                    "simulation_days must be in 1..={MAX_SIMULATION_DAYS}, got {days}"
                )));
            }
        }
        if let SourceConfig::Synthetic { bars, volatility, .. } = &self.source {
            if *bars == 0 {
                return Err(ConfigError::Data("synthetic bars must be > 0".into()));
            }
            if !(*volatility > 0.0 && *volatility < 0.5) {
                return Err(ConfigError::Data(format!(
                    "synthetic volatility must be in (0, 0.5), got {volatility}"
                )));
            }
        }
        Ok(())
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Csv {
        path: PathBuf,
    },
    /// Seeded random walk; results are tagged synthetic.
    Synthetic {
        seed: u64,
        bars: usize,
        #[serde(default = "default_start_price")]
        start_price: f64,
        /// Max absolute close-to-close return per bar.
        #[serde(default = "default_volatility")]
        volatility: f64,
    },
}

fn default_start_price() -> f64 {
    30_000.0
}

fn default_volatility() -> f64 {
    0.01
}

// ── Strategy ─────────────────────────────────────────────────────────

/// Entry signal selection (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Precomputed condition columns.
    Conditions {
        #[serde(default)]
        long: Option<String>,
        #[serde(default)]
        short: Option<String>,
        /// `(long, short)` columns holding intrabar entry prices.
        #[serde(default)]
        entry_price_columns: Option<(String, String)>,
        /// `(long, short)` columns holding explicit stop levels.
        #[serde(default)]
        stop_columns: Option<(String, String)>,
    },

    /// Prior-channel breakout confirmed by a volume spike.
    Breakout {
        #[serde(default = "default_channel_period")]
        channel_period: usize,
        #[serde(default = "default_volume_threshold")]
        volume_threshold: f64,
        #[serde(default = "default_channel_period")]
        volume_period: usize,
        #[serde(default)]
        long_only: bool,
    },

    /// Model direction above a confidence threshold.
    Predictor {
        #[serde(default = "default_up_column")]
        up_column: String,
        #[serde(default = "default_down_column")]
        down_column: String,
        min_confidence: f64,
    },

    /// Condition columns vetoed by a model that disagrees or is unsure.
    FilteredConditions {
        #[serde(default)]
        long: Option<String>,
        #[serde(default)]
        short: Option<String>,
        #[serde(default = "default_up_column")]
        up_column: String,
        #[serde(default = "default_down_column")]
        down_column: String,
        min_confidence: f64,
        #[serde(default)]
        require_direction: bool,
    },

    /// Never trades; baseline.
    Null,
}

fn default_channel_period() -> usize {
    20
}

fn default_volume_threshold() -> f64 {
    1.5
}

fn default_up_column() -> String {
    "prob_up".into()
}

fn default_down_column() -> String {
    "prob_down".into()
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Breakout {
            channel_period: default_channel_period(),
            volume_threshold: default_volume_threshold(),
            volume_period: default_channel_period(),
            long_only: false,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: String| Err(ConfigError::Data(msg));
        match self {
            Self::Conditions { long, short, .. } | Self::FilteredConditions { long, short, .. }
                if long.is_none() && short.is_none() =>
            {
                bad("strategy needs a long or short condition column".into())
            }
            Self::Breakout {
                channel_period,
                volume_period,
                ..
            } if *channel_period == 0 || *volume_period == 0 => {
                bad("breakout periods must be > 0".into())
            }
            Self::Predictor { min_confidence, .. }
            | Self::FilteredConditions { min_confidence, .. }
                if !(0.0..=1.0).contains(min_confidence) =>
            {
                bad(format!("min_confidence must be in [0, 1], got {min_confidence}"))
            }
            _ => Ok(()),
        }
    }

    /// Bars a strategy needs before its first decision.
    pub fn lookback(&self) -> usize {
        match self {
            Self::Breakout {
                channel_period,
                volume_period,
                ..
            } => (*channel_period).max(*volume_period),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaylab_core::engine::StopRule;

    const SAMPLE: &str = r#"
[data]
symbol = "BTCUSDT"
timeframe = "1h"
simulation_days = 30
source = { type = "synthetic", seed = 7, bars = 2000 }

[engine]
risk_per_trade = 0.02
cooldown_bars = 5
stop_rule = { type = "percent", pct = 0.01 }

[strategy]
type = "predictor"
min_confidence = 0.7
"#;

    #[test]
    fn parses_sample() {
        let cfg = RunConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.data.symbol, "BTCUSDT");
        assert_eq!(cfg.data.atr_period, 14);
        assert_eq!(cfg.engine.risk_per_trade, 0.02);
        assert_eq!(cfg.engine.stop_rule, StopRule::Percent { pct: 0.01 });
        assert_eq!(
            cfg.strategy,
            StrategyConfig::Predictor {
                up_column: "prob_up".into(),
                down_column: "prob_down".into(),
                min_confidence: 0.7,
            }
        );
        match cfg.data.source {
            SourceConfig::Synthetic {
                seed, start_price, ..
            } => {
                assert_eq!(seed, 7);
                assert_eq!(start_price, 30_000.0);
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn strategy_defaults_to_breakout() {
        let cfg = RunConfig::from_toml_str(
            "[data]\nsymbol = \"ETHUSDT\"\nsource = { type = \"csv\", path = \"x.csv\" }\n",
        )
        .unwrap();
        assert_eq!(cfg.strategy, StrategyConfig::default());
        assert_eq!(cfg.strategy.lookback(), 20);
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = RunConfig::from_toml_str(SAMPLE).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
        b.engine.cooldown_bars = 6;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
    }

    #[test]
    fn invalid_engine_field_rejected() {
        let text = SAMPLE.replace("risk_per_trade = 0.02", "risk_per_trade = 1.5");
        assert!(matches!(
            RunConfig::from_toml_str(&text),
            Err(ConfigError::Engine(_))
        ));
    }

    #[test]
    fn conditions_need_a_column() {
        let text = SAMPLE.replace(
            "type = \"predictor\"\nmin_confidence = 0.7",
            "type = \"conditions\"",
        );
        assert!(matches!(
            RunConfig::from_toml_str(&text),
            Err(ConfigError::Data(_))
        ));
    }

    #[test]
    fn simulation_days_out_of_range_rejected() {
        for days in ["0", "4294967295"] {
            let text = SAMPLE.replace("simulation_days = 30", &format!("simulation_days = {days}"));
            let err = RunConfig::from_toml_str(&text).unwrap_err();
            assert!(err.to_string().contains("simulation_days"), "{days}: {err}");
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RunConfig::from_file(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }
}
