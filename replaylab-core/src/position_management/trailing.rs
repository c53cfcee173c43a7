//! Trailing stop measured in R units from the extreme since entry.

use super::StopAdjuster;
use crate::domain::{Bar, Position, Side};

/// After the extreme since entry reaches `activation_r`, trail it by
/// `distance_r * initial_stop_distance`.
#[derive(Debug, Clone, Copy)]
pub struct RTrailing {
    activation_r: f64,
    distance_r: f64,
}

impl RTrailing {
    pub fn new(activation_r: f64, distance_r: f64) -> Self {
        Self {
            activation_r,
            distance_r,
        }
    }
}

impl StopAdjuster for RTrailing {
    fn name(&self) -> &str {
        "r_trailing"
    }

    fn propose(&self, position: &Position, _bar: &Bar, _cost_rate: f64) -> Option<f64> {
        let extreme = match position.side {
            Side::Long => position.highest_high,
            Side::Short => position.lowest_low,
        };
        if position.r_multiple(extreme) < self.activation_r {
            return None;
        }
        let offset = self.distance_r * position.initial_stop_distance;
        Some(extreme - position.side.sign() * offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn short_trails_lowest_low() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut pos = Position::open(Side::Short, 100.0, 0, t, 1000.0, 104.0, 80.0);
        let bar = Bar::new(t, 99.0, 99.5, 91.0, 92.0, 1.0);
        pos.update_extremes(&bar);
        // 9 / 4 = 2.25R ≥ 2R; trail 1R above 91.
        let level = RTrailing::new(2.0, 1.0).propose(&pos, &bar, 0.0).unwrap();
        assert!((level - 95.0).abs() < 1e-12);
    }

    #[test]
    fn inactive_before_activation() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut pos = Position::open(Side::Long, 100.0, 0, t, 1000.0, 96.0, 120.0);
        let bar = Bar::new(t, 100.0, 103.0, 99.0, 102.0, 1.0);
        pos.update_extremes(&bar);
        assert_eq!(RTrailing::new(1.0, 0.5).propose(&pos, &bar, 0.0), None);
    }
}
