//! Position management: dynamic stop adjustment under the ratchet invariant.
//!
//! **Key rules:**
//! 1. Adjusters only *propose* a stop; the ratchet decides whether it applies
//! 2. **Ratchet invariant**: stops may tighten, never loosen
//! 3. R-multiples are measured against the stop distance frozen at entry
//!
//! **Module Structure:**
//! - `ratchet`: favorable-direction-only stop updates
//! - `breakeven`: move the stop to a fee-covering breakeven after N R
//! - `trailing`: trail the extreme since entry by a distance in R

pub mod breakeven;
pub mod ratchet;
pub mod trailing;

pub use breakeven::Breakeven;
pub use ratchet::{is_tighter, ratchet};
pub use trailing::RTrailing;

use crate::domain::{Bar, Position};

/// Proposes a new stop for an open position at the current bar.
pub trait StopAdjuster: Send + Sync {
    fn name(&self) -> &str;

    /// `None` means "no opinion this bar". `cost_rate` is fee plus slippage
    /// per side.
    fn propose(&self, position: &Position, bar: &Bar, cost_rate: f64) -> Option<f64>;
}

/// Run every adjuster and ratchet the position's stop. Returns true if the
/// stop moved.
pub fn adjust_stop(
    position: &mut Position,
    bar: &Bar,
    adjusters: &[Box<dyn StopAdjuster>],
    cost_rate: f64,
) -> bool {
    let before = position.stop;
    for adjuster in adjusters {
        if let Some(proposed) = adjuster.propose(position, bar, cost_rate) {
            position.stop = ratchet(position.side, position.stop, proposed);
        }
    }
    position.stop != before
}
