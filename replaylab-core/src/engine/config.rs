//! Engine configuration and its validation.
//!
//! One explicit, versioned struct replaces per-strategy globals. Every field
//! has a serde default so TOML files only list what they change.

use crate::position_management::{Breakeven, RTrailing, StopAdjuster};
use crate::sizers::{EquityFractionSizer, FixedFractionalSizer, RiskTier, Sizer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current config layout. Bump when a field changes meaning.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("{field} must name a column")]
    EmptyColumn { field: &'static str },

    #[error("config schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
}

/// How the stop distance is derived at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopRule {
    /// `multiplier * column[t]`, typically an ATR column.
    AtrMultiple { column: String, multiplier: f64 },
    /// Fixed fraction of the entry price.
    Percent { pct: f64 },
}

impl StopRule {
    pub fn required_column(&self) -> Option<&str> {
        match self {
            StopRule::AtrMultiple { column, .. } => Some(column),
            StopRule::Percent { .. } => None,
        }
    }
}

impl Default for StopRule {
    fn default() -> Self {
        StopRule::AtrMultiple {
            column: "atr".into(),
            multiplier: 1.5,
        }
    }
}

/// How notional is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingMode {
    /// Risk `risk_per_trade` of equity between entry and stop.
    #[default]
    Risk,
    /// A fixed fraction of equity, times `max_leverage`.
    EquityFraction { fraction: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub activation_r: f64,
    pub distance_r: f64,
}

/// Periodic funding on open perpetual positions.
///
/// Every `interval_bars` bars after entry, longs pay `notional * rate` and
/// shorts receive it (negative rates reverse the flow). When `column` is set
/// and finite at the bar, it overrides `rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingConfig {
    pub interval_bars: usize,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub column: Option<String>,
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema_version: u32,

    // ── Account ──
    pub initial_capital: f64,
    /// Size from current capital (true) or initial capital (false). Also
    /// selects compound vs simple monthly normalization.
    pub compounding: bool,

    // ── Sizing ──
    pub sizing: SizingMode,
    /// Fraction of equity risked per trade, in (0, 1].
    pub risk_per_trade: f64,
    pub max_leverage: f64,
    /// Return-dependent multipliers on `risk_per_trade`.
    pub risk_scaling: Vec<RiskTier>,

    // ── Costs (per side) ──
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub funding: Option<FundingConfig>,

    // ── Entries ──
    pub stop_rule: StopRule,
    /// Smallest stop distance as a fraction of entry; tighter stops are widened.
    pub min_stop_distance_pct: f64,
    /// Target distance = stop distance * ratio.
    pub take_profit_reward_ratio: f64,
    pub cooldown_bars: usize,
    pub max_positions: usize,
    pub max_entries_per_day: Option<u32>,
    /// Realize the stop immediately when an intrabar fill's own bar breaches it.
    pub instant_stop_check: bool,
    /// Leading bars that are not simulated (indicator warmup).
    pub warmup_bars: usize,

    // ── Exits ──
    pub max_holding_bars: Option<usize>,
    pub breakeven_r_trigger: Option<f64>,
    pub trailing: Option<TrailingConfig>,
    /// Close open positions at the final bar's close.
    pub close_at_end: bool,

    // ── Circuit breakers ──
    /// Halt when capital < fraction * initial capital.
    pub circuit_breaker_fraction: f64,
    /// Halt when drawdown from peak capital exceeds this fraction.
    pub max_drawdown_halt: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            initial_capital: 10_000.0,
            compounding: true,
            sizing: SizingMode::Risk,
            risk_per_trade: 0.01,
            max_leverage: 3.0,
            risk_scaling: Vec::new(),
            fee_rate: 0.0004,
            slippage_rate: 0.0001,
            funding: None,
            stop_rule: StopRule::default(),
            min_stop_distance_pct: 0.003,
            take_profit_reward_ratio: 2.0,
            cooldown_bars: 3,
            max_positions: 1,
            max_entries_per_day: None,
            instant_stop_check: true,
            warmup_bars: 0,
            max_holding_bars: None,
            breakeven_r_trigger: None,
            trailing: None,
            close_at_end: false,
            circuit_breaker_fraction: 0.1,
            max_drawdown_halt: None,
        }
    }
}

fn check(
    ok: bool,
    field: &'static str,
    requirement: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value,
        })
    }
}

impl EngineConfig {
    /// Validate and return the config, so construction can fail fast.
    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(ConfigError::SchemaVersion {
                found: self.schema_version,
                expected: CONFIG_SCHEMA_VERSION,
            });
        }
        let c = self;
        check(c.initial_capital > 0.0, "initial_capital", "> 0", c.initial_capital)?;
        check(
            c.risk_per_trade > 0.0 && c.risk_per_trade <= 1.0,
            "risk_per_trade",
            "in (0, 1]",
            c.risk_per_trade,
        )?;
        check(c.max_leverage > 0.0, "max_leverage", "> 0", c.max_leverage)?;
        check(c.fee_rate >= 0.0, "fee_rate", ">= 0", c.fee_rate)?;
        check(c.slippage_rate >= 0.0, "slippage_rate", ">= 0", c.slippage_rate)?;
        check(
            c.take_profit_reward_ratio > 0.0,
            "take_profit_reward_ratio",
            "> 0",
            c.take_profit_reward_ratio,
        )?;
        check(
            (0.0..1.0).contains(&c.circuit_breaker_fraction),
            "circuit_breaker_fraction",
            "in [0, 1)",
            c.circuit_breaker_fraction,
        )?;
        check(
            (0.0..1.0).contains(&c.min_stop_distance_pct),
            "min_stop_distance_pct",
            "in [0, 1)",
            c.min_stop_distance_pct,
        )?;
        check(
            c.max_positions >= 1,
            "max_positions",
            ">= 1",
            c.max_positions as f64,
        )?;

        match &c.stop_rule {
            StopRule::AtrMultiple { column, multiplier } => {
                if column.trim().is_empty() {
                    return Err(ConfigError::EmptyColumn {
                        field: "stop_rule.column",
                    });
                }
                check(*multiplier > 0.0, "stop_rule.multiplier", "> 0", *multiplier)?;
            }
            StopRule::Percent { pct } => {
                check(*pct > 0.0 && *pct < 1.0, "stop_rule.pct", "in (0, 1)", *pct)?;
                // Otherwise every short target lands at or below zero.
                let reach = pct.max(c.min_stop_distance_pct) * c.take_profit_reward_ratio;
                check(
                    reach < 1.0,
                    "stop_rule.pct * take_profit_reward_ratio",
                    "< 1",
                    reach,
                )?;
            }
        }
        if let SizingMode::EquityFraction { fraction } = c.sizing {
            check(
                fraction > 0.0 && fraction <= 1.0,
                "sizing.fraction",
                "in (0, 1]",
                fraction,
            )?;
        }
        if let Some(n) = c.max_holding_bars {
            check(n > 0, "max_holding_bars", "> 0", n as f64)?;
        }
        if let Some(r) = c.breakeven_r_trigger {
            check(r > 0.0, "breakeven_r_trigger", "> 0", r)?;
        }
        if let Some(t) = &c.trailing {
            check(t.activation_r > 0.0, "trailing.activation_r", "> 0", t.activation_r)?;
            check(t.distance_r > 0.0, "trailing.distance_r", "> 0", t.distance_r)?;
        }
        if let Some(dd) = c.max_drawdown_halt {
            check(dd > 0.0 && dd < 1.0, "max_drawdown_halt", "in (0, 1)", dd)?;
        }
        if let Some(n) = c.max_entries_per_day {
            check(n > 0, "max_entries_per_day", "> 0", f64::from(n))?;
        }
        for tier in &c.risk_scaling {
            check(tier.multiplier > 0.0, "risk_scaling.multiplier", "> 0", tier.multiplier)?;
            check(
                tier.return_threshold.is_finite(),
                "risk_scaling.return_threshold",
                "finite",
                tier.return_threshold,
            )?;
        }
        if let Some(f) = &c.funding {
            check(
                f.interval_bars > 0,
                "funding.interval_bars",
                "> 0",
                f.interval_bars as f64,
            )?;
            check(f.rate.is_finite(), "funding.rate", "finite", f.rate)?;
            if f.column.as_deref().is_some_and(|s| s.trim().is_empty()) {
                return Err(ConfigError::EmptyColumn {
                    field: "funding.column",
                });
            }
        }
        Ok(())
    }

    /// Fee plus slippage, per side.
    pub fn cost_rate(&self) -> f64 {
        self.fee_rate + self.slippage_rate
    }

    /// Columns that must be finite at every simulated bar (the stop rule's).
    pub fn required_columns(&self) -> Vec<String> {
        self.stop_rule
            .required_column()
            .map(str::to_string)
            .into_iter()
            .collect()
    }

    /// Columns that must exist but may hold `NaN` (funding falls back to
    /// `rate`).
    pub fn optional_columns(&self) -> Vec<String> {
        self.funding
            .as_ref()
            .and_then(|f| f.column.clone())
            .into_iter()
            .collect()
    }

    pub(crate) fn build_sizer(&self) -> Box<dyn Sizer> {
        match self.sizing {
            SizingMode::Risk => Box::new(FixedFractionalSizer),
            SizingMode::EquityFraction { fraction } => Box::new(EquityFractionSizer::new(fraction)),
        }
    }

    pub(crate) fn build_stop_adjusters(&self) -> Vec<Box<dyn StopAdjuster>> {
        let mut out: Vec<Box<dyn StopAdjuster>> = Vec::new();
        if let Some(r) = self.breakeven_r_trigger {
            out.push(Box::new(Breakeven::new(r)));
        }
        if let Some(t) = self.trailing {
            out.push(Box::new(RTrailing::new(t.activation_r, t.distance_r)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> &'static str {
        match err {
            ConfigError::OutOfRange { field, .. } | ConfigError::EmptyColumn { field } => field,
            ConfigError::SchemaVersion { .. } => "schema_version",
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capital_names_field() {
        let cfg = EngineConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert_eq!(field_of(cfg.validate().unwrap_err()), "initial_capital");
    }

    #[test]
    fn risk_above_one_rejected() {
        let cfg = EngineConfig {
            risk_per_trade: 1.5,
            ..Default::default()
        };
        assert_eq!(field_of(EngineConfig::try_new(cfg).unwrap_err()), "risk_per_trade");
    }

    #[test]
    fn full_risk_accepted() {
        let cfg = EngineConfig {
            risk_per_trade: 1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn nan_fee_rejected() {
        let cfg = EngineConfig {
            fee_rate: f64::NAN,
            ..Default::default()
        };
        assert_eq!(field_of(cfg.validate().unwrap_err()), "fee_rate");
    }

    #[test]
    fn zero_max_holding_rejected() {
        let cfg = EngineConfig {
            max_holding_bars: Some(0),
            ..Default::default()
        };
        assert_eq!(field_of(cfg.validate().unwrap_err()), "max_holding_bars");
    }

    #[test]
    fn breaker_fraction_of_one_rejected() {
        let cfg = EngineConfig {
            circuit_breaker_fraction: 1.0,
            ..Default::default()
        };
        assert_eq!(field_of(cfg.validate().unwrap_err()), "circuit_breaker_fraction");
    }

    #[test]
    fn empty_stop_column_rejected() {
        let cfg = EngineConfig {
            stop_rule: StopRule::AtrMultiple {
                column: " ".into(),
                multiplier: 2.0,
            },
            ..Default::default()
        };
        assert_eq!(field_of(cfg.validate().unwrap_err()), "stop_rule.column");
    }

    #[test]
    fn percent_stop_with_unreachable_short_target_rejected() {
        let cfg = EngineConfig {
            stop_rule: StopRule::Percent { pct: 0.5 },
            take_profit_reward_ratio: 3.0,
            ..Default::default()
        };
        assert_eq!(
            field_of(cfg.validate().unwrap_err()),
            "stop_rule.pct * take_profit_reward_ratio"
        );
        let ok = EngineConfig {
            stop_rule: StopRule::Percent { pct: 0.3 },
            ..cfg
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn unknown_schema_version_rejected() {
        let cfg = EngineConfig {
            schema_version: 99,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::SchemaVersion { found: 99, .. }
        ));
    }

    #[test]
    fn funding_column_is_optional_not_required() {
        let cfg = EngineConfig {
            funding: Some(FundingConfig {
                interval_bars: 8,
                rate: 0.0,
                column: Some("funding_rate".into()),
            }),
            ..Default::default()
        };
        assert_eq!(cfg.required_columns(), vec!["atr"]);
        assert_eq!(cfg.optional_columns(), vec!["funding_rate"]);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            risk_per_trade = 0.02
            cooldown_bars = 5

            [stop_rule]
            type = "percent"
            pct = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(cfg.risk_per_trade, 0.02);
        assert_eq!(cfg.cooldown_bars, 5);
        assert_eq!(cfg.stop_rule, StopRule::Percent { pct: 0.01 });
        assert_eq!(cfg.initial_capital, 10_000.0);
        assert!(cfg.validate().is_ok());
    }
}
