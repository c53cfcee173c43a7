//! Strategy components: entry signals, model predictors, and filters.
//!
//! - Entry signal: decides long / short / nothing at a bar
//! - Predictor: model boundary returning direction + confidence
//! - Signal filter: vetoes entries (e.g. on model disagreement)

pub mod filter;
pub mod predictor;
pub mod signal;

pub use filter::{FilterVerdict, Filtered, PredictorFilter, SignalFilter};
pub use predictor::{ColumnPredictor, Prediction, Predictor, PredictorSignal};
pub use signal::{
    BarContext, ConditionSignal, EntryDecision, EntryLevels, EntrySignal, NullSignal,
};
