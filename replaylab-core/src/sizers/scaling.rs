//! Return-dependent risk scaling.
//!
//! Tiers multiply the base risk fraction according to the account's running
//! return: positive thresholds press when ahead, negative thresholds cut risk
//! when behind.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTier {
    /// Fractional return on initial capital (e.g. 0.10 = +10%).
    pub return_threshold: f64,
    pub multiplier: f64,
}

/// Effective risk fraction for the current running return.
///
/// Non-negative thresholds fire when `running_return >= threshold` and the
/// highest matching one wins; negative thresholds fire when
/// `running_return <= threshold` and the lowest matching one wins. With no
/// match the base fraction is returned unchanged.
pub fn scaled_risk(base: f64, running_return: f64, tiers: &[RiskTier]) -> f64 {
    let gain_tier = tiers
        .iter()
        .filter(|t| t.return_threshold >= 0.0 && running_return >= t.return_threshold)
        .max_by(|a, b| a.return_threshold.total_cmp(&b.return_threshold));
    let loss_tier = tiers
        .iter()
        .filter(|t| t.return_threshold < 0.0 && running_return <= t.return_threshold)
        .min_by(|a, b| a.return_threshold.total_cmp(&b.return_threshold));

    match gain_tier.or(loss_tier) {
        Some(tier) => base * tier.multiplier,
        None => base,
    }
}
