use crate::core::horse::Horse;
use serde::Serialize;

/// HorsePosition tracks the progress of one horse during a round.
/// * `horse` - The running horse
/// * `position` - Current rank in the field, starting at 1
/// * `lane` - Lane assigned at the start, never changes during a round
/// * `progress` - (%) Share of the round distance covered, in [0, 100]
/// * `distance` - (m) Distance covered, in [0, round distance]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorsePosition {
    pub horse: Horse,
    pub position: u32,
    pub lane: u32,
    pub progress: f64,
    pub distance: f64,
}

impl HorsePosition {
    /// new places a horse on the start line; lane and initial position follow the start order.
    pub fn new(horse: Horse, lane: u32) -> HorsePosition {
        HorsePosition {
            horse,
            position: lane,
            lane,
            progress: 0.0,
            distance: 0.0,
        }
    }

    pub fn has_finished(&self, total_distance: f64) -> bool {
        self.distance >= total_distance
    }

    /// advance moves the horse forward by `step` meters without overshooting the finish line.
    pub fn advance(&mut self, step: f64, total_distance: f64) {
        self.distance = (self.distance + step.max(0.0)).min(total_distance);
        self.progress = calc_progress(self.distance, total_distance);
    }

    /// finish pins the horse to the finish line.
    pub fn finish(&mut self, total_distance: f64) {
        self.distance = total_distance;
        self.progress = 100.0;
    }
}

/// calc_progress returns the covered share of the total distance in percent, clamped to [0, 100].
pub fn calc_progress(distance: f64, total_distance: f64) -> f64 {
    if total_distance <= 0.0 {
        return 100.0;
    }
    (distance / total_distance * 100.0).clamp(0.0, 100.0)
}
