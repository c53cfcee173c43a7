//! Strategy assembly: a [`StrategyConfig`] becomes an entry signal plus the
//! feature columns that signal reads.

use replaylab_core::components::{
    ColumnPredictor, ConditionSignal, EntrySignal, Filtered, NullSignal, PredictorFilter,
    PredictorSignal,
};
use replaylab_core::domain::{BarSeries, SeriesError};
use replaylab_core::indicators::{breakout_conditions, BreakoutParams};

use crate::config::StrategyConfig;

const LONG_BREAKOUT: &str = "long_breakout";
const SHORT_BREAKOUT: &str = "short_breakout";

/// Attach the columns the strategy computes itself.
///
/// Only the breakout strategy derives columns; the others read columns the
/// bar source already provides.
pub fn prepare_features(strategy: &StrategyConfig, series: &mut BarSeries) -> Result<(), SeriesError> {
    if let StrategyConfig::Breakout {
        channel_period,
        volume_threshold,
        volume_period,
        ..
    } = strategy
    {
        let params = BreakoutParams {
            channel_period: *channel_period,
            volume_threshold: *volume_threshold,
            volume_period: *volume_period,
        };
        breakout_conditions(series, &params)?;
    }
    Ok(())
}

fn conditions(long: &Option<String>, short: &Option<String>) -> ConditionSignal {
    ConditionSignal::new(long.clone(), short.clone())
}

/// Build the entry signal a strategy config selects.
pub fn build_signal(strategy: &StrategyConfig) -> Box<dyn EntrySignal> {
    match strategy {
        StrategyConfig::Conditions {
            long,
            short,
            entry_price_columns,
            stop_columns,
        } => {
            let mut signal = conditions(long, short);
            if let Some((l, s)) = entry_price_columns {
                signal = signal.with_entry_price_columns(l, s);
            }
            if let Some((l, s)) = stop_columns {
                signal = signal.with_stop_columns(l, s);
            }
            Box::new(signal)
        }
        StrategyConfig::Breakout { long_only, .. } => {
            let short = (!long_only).then(|| SHORT_BREAKOUT.to_string());
            Box::new(ConditionSignal::new(Some(LONG_BREAKOUT.to_string()), short))
        }
        StrategyConfig::Predictor {
            up_column,
            down_column,
            min_confidence,
        } => Box::new(PredictorSignal::new(
            Box::new(ColumnPredictor::new(up_column, down_column)),
            *min_confidence,
        )),
        StrategyConfig::FilteredConditions {
            long,
            short,
            up_column,
            down_column,
            min_confidence,
            require_direction,
        } => {
            let filter = PredictorFilter::new(
                Box::new(ColumnPredictor::new(up_column, down_column)),
                *min_confidence,
            )
            .require_direction(*require_direction);
            Box::new(Filtered::new(
                Box::new(conditions(long, short)),
                Box::new(filter),
            ))
        }
        StrategyConfig::Null => Box::new(NullSignal),
    }
}
