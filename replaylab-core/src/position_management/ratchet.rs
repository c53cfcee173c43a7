//! Ratchet invariant: stops may tighten, never loosen.
//!
//! - Long positions: a stop can only rise
//! - Short positions: a stop can only fall

use crate::domain::Side;

/// Apply the ratchet to a proposed stop. Returns the level to keep.
///
/// ```
/// use replaylab_core::domain::Side;
/// use replaylab_core::position_management::ratchet;
///
/// assert_eq!(ratchet(Side::Long, 95.0, 100.0), 100.0);
/// assert_eq!(ratchet(Side::Long, 100.0, 90.0), 100.0);
/// assert_eq!(ratchet(Side::Short, 105.0, 110.0), 105.0);
/// ```
pub fn ratchet(side: Side, current: f64, proposed: f64) -> f64 {
    if !proposed.is_finite() {
        return current;
    }
    if is_tighter(side, current, proposed) {
        proposed
    } else {
        current
    }
}

/// True when `proposed` is strictly tighter than `current` for `side`.
pub fn is_tighter(side: Side, current: f64, proposed: f64) -> bool {
    match side {
        Side::Long => proposed > current,
        Side::Short => proposed < current,
    }
}
