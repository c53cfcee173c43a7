//! Signal filters: gate another signal's decisions.
//!
//! A filter never creates an entry; it can only veto one. [`Filtered`] wraps
//! a signal and a filter into a single [`EntrySignal`].

use super::predictor::Predictor;
use super::signal::{BarContext, EntryDecision, EntryLevels, EntrySignal};
use crate::domain::Side;

/// Outcome of a filter evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Passed,
    LowConfidence,
    DirectionDisagrees,
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Trait for signal filters.
pub trait SignalFilter: Send + Sync {
    fn name(&self) -> &str;

    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether an entry on `side` at `ctx` may proceed.
    fn evaluate(&self, ctx: &BarContext<'_>, side: Side) -> FilterVerdict;
}

/// Requires model confidence and no directional disagreement.
///
/// A neutral prediction agrees with both sides unless `require_direction`
/// is set.
pub struct PredictorFilter {
    predictor: Box<dyn Predictor>,
    min_confidence: f64,
    require_direction: bool,
}

impl PredictorFilter {
    pub fn new(predictor: Box<dyn Predictor>, min_confidence: f64) -> Self {
        Self {
            predictor,
            min_confidence,
            require_direction: false,
        }
    }

    pub fn require_direction(mut self, require: bool) -> Self {
        self.require_direction = require;
        self
    }
}

impl SignalFilter for PredictorFilter {
    fn name(&self) -> &str {
        "predictor_filter"
    }

    fn required_columns(&self) -> Vec<String> {
        self.predictor.required_columns()
    }

    fn evaluate(&self, ctx: &BarContext<'_>, side: Side) -> FilterVerdict {
        let p = self.predictor.predict(ctx);
        if p.confidence < self.min_confidence {
            return FilterVerdict::LowConfidence;
        }
        match p.direction {
            Some(d) if d != side => FilterVerdict::DirectionDisagrees,
            None if self.require_direction => FilterVerdict::DirectionDisagrees,
            _ => FilterVerdict::Passed,
        }
    }
}

/// A signal gated by a filter.
pub struct Filtered {
    name: String,
    inner: Box<dyn EntrySignal>,
    filter: Box<dyn SignalFilter>,
}

impl Filtered {
    pub fn new(inner: Box<dyn EntrySignal>, filter: Box<dyn SignalFilter>) -> Self {
        let name = format!("{}+{}", inner.name(), filter.name());
        Self {
            name,
            inner,
            filter,
        }
    }
}

impl EntrySignal for Filtered {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> Vec<String> {
        let mut cols = self.inner.required_columns();
        for c in self.filter.required_columns() {
            if !cols.contains(&c) {
                cols.push(c);
            }
        }
        cols
    }

    fn level_columns(&self) -> Vec<String> {
        self.inner.level_columns()
    }

    fn evaluate_entry(&self, ctx: &BarContext<'_>) -> EntryDecision {
        let decision = self.inner.evaluate_entry(ctx);
        match decision.side() {
            Some(side) if self.filter.evaluate(ctx, side).is_passed() => decision,
            _ => EntryDecision::None,
        }
    }

    fn entry_levels(&self, ctx: &BarContext<'_>, side: Side) -> EntryLevels {
        self.inner.entry_levels(ctx, side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::predictor::stubs::FixedPredictor;
    use crate::components::predictor::Prediction;
    use crate::components::signal::ConditionSignal;
    use crate::domain::{Bar, BarSeries};
    use chrono::{TimeZone, Utc};

    fn series() -> BarSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut s =
            BarSeries::new("BTCUSDT", "1h", vec![Bar::new(t0, 100.0, 101.0, 99.0, 100.0, 1.0)])
                .unwrap();
        s.insert_flag("long", vec![true]).unwrap();
        s
    }

    fn filtered(direction: Option<Side>, confidence: f64, require: bool) -> Filtered {
        let filter = PredictorFilter::new(
            Box::new(FixedPredictor(Prediction {
                direction,
                confidence,
            })),
            0.65,
        )
        .require_direction(require);
        Filtered::new(Box::new(ConditionSignal::long_only("long")), Box::new(filter))
    }

    #[test]
    fn agreeing_confident_model_passes() {
        let s = series();
        let sig = filtered(Some(Side::Long), 0.7, false);
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 0)), EntryDecision::Long);
        assert_eq!(sig.name(), "conditions+predictor_filter");
    }

    #[test]
    fn disagreeing_model_vetoes() {
        let s = series();
        let sig = filtered(Some(Side::Short), 0.9, false);
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 0)), EntryDecision::None);
    }

    #[test]
    fn low_confidence_vetoes() {
        let s = series();
        let sig = filtered(Some(Side::Long), 0.6, false);
        assert_eq!(sig.evaluate_entry(&BarContext::new(&s, 0)), EntryDecision::None);
    }

    #[test]
    fn neutral_passes_unless_direction_required() {
        let s = series();
        let ctx = BarContext::new(&s, 0);
        assert_eq!(filtered(None, 0.7, false).evaluate_entry(&ctx), EntryDecision::Long);
        assert_eq!(filtered(None, 0.7, true).evaluate_entry(&ctx), EntryDecision::None);
    }
}
