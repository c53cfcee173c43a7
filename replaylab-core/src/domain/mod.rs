//! Domain types for ReplayLab

pub mod account;
pub mod bar;
pub mod position;
pub mod series;
pub mod trade;

pub use account::Account;
pub use bar::Bar;
pub use position::{Position, Side};
pub use series::{BarSeries, Column, SeriesError};
pub use trade::{ExitKind, TradeRecord};
