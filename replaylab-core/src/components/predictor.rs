//! Model collaborator boundary.
//!
//! A [`Predictor`] turns the history window ending at a bar into a direction
//! and a confidence. Models are trained and run elsewhere; the engine only
//! consumes their output, so tests use deterministic stubs.

use super::signal::{BarContext, EntryDecision, EntrySignal};
use crate::domain::Side;
use serde::{Deserialize, Serialize};

/// Direction plus confidence in `[0, 1]`. `direction: None` is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub direction: Option<Side>,
    pub confidence: f64,
}

impl Prediction {
    pub fn neutral() -> Self {
        Self {
            direction: None,
            confidence: 0.5,
        }
    }
}

pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// Columns the model reads.
    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Predict from `ctx.history()` and columns up to `ctx.index()`.
    fn predict(&self, ctx: &BarContext<'_>) -> Prediction;
}

/// Reads precomputed class probabilities from two columns.
///
/// The larger probability picks the direction; equal probabilities are
/// neutral. Confidence is the larger probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPredictor {
    up_column: String,
    down_column: String,
}

impl ColumnPredictor {
    pub fn new(up_column: impl Into<String>, down_column: impl Into<String>) -> Self {
        Self {
            up_column: up_column.into(),
            down_column: down_column.into(),
        }
    }
}

impl Default for ColumnPredictor {
    fn default() -> Self {
        Self::new("prob_up", "prob_down")
    }
}

impl Predictor for ColumnPredictor {
    fn name(&self) -> &str {
        "column_predictor"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.up_column.clone(), self.down_column.clone()]
    }

    fn predict(&self, ctx: &BarContext<'_>) -> Prediction {
        let (Some(up), Some(down)) = (ctx.numeric(&self.up_column), ctx.numeric(&self.down_column))
        else {
            return Prediction::neutral();
        };
        if !up.is_finite() || !down.is_finite() {
            return Prediction::neutral();
        }
        let direction = if up > down {
            Some(Side::Long)
        } else if down > up {
            Some(Side::Short)
        } else {
            None
        };
        Prediction {
            direction,
            confidence: up.max(down).clamp(0.0, 1.0),
        }
    }
}

/// Enters in the model's direction when its confidence clears a threshold.
pub struct PredictorSignal {
    predictor: Box<dyn Predictor>,
    min_confidence: f64,
}

impl PredictorSignal {
    pub fn new(predictor: Box<dyn Predictor>, min_confidence: f64) -> Self {
        Self {
            predictor,
            min_confidence,
        }
    }
}

impl EntrySignal for PredictorSignal {
    fn name(&self) -> &str {
        "predictor"
    }

    fn required_columns(&self) -> Vec<String> {
        self.predictor.required_columns()
    }

    fn evaluate_entry(&self, ctx: &BarContext<'_>) -> EntryDecision {
        let p = self.predictor.predict(ctx);
        if p.confidence < self.min_confidence {
            return EntryDecision::None;
        }
        match p.direction {
            Some(Side::Long) => EntryDecision::Long,
            Some(Side::Short) => EntryDecision::Short,
            None => EntryDecision::None,
        }
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    use super::*;

    /// Always returns the same prediction.
    pub struct FixedPredictor(pub Prediction);

    impl Predictor for FixedPredictor {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _ctx: &BarContext<'_>) -> Prediction {
            self.0
        }
    }
}
