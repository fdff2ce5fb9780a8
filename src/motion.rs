//! Distance and velocity between consecutive fixes.
//!
//! Distances are geodesic (Karney, WGS84) in meters and velocities are in
//! meters per second. A [`MotionTracker`] belongs to exactly one track or
//! lap, so motion never carries over from one to the next.

use geo::{Distance, Geodesic};

use crate::types::Fix;

/// Geodesic distance in meters between two fixes.
pub fn geodesic_distance(from: &Fix, to: &Fix) -> f64 {
    Geodesic::distance(from.point(), to.point())
}

/// Movement from the previous fix to the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Step {
    pub delta_m: f64,
    /// Zero when there is no previous fix or no time has elapsed.
    pub velocity_mps: f64,
}

#[derive(Debug, Default)]
pub struct MotionTracker {
    previous: Option<Fix>,
    travelled_m: f64,
}

impl MotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, fix: &Fix) -> Step {
        let step = match &self.previous {
            None => Step::default(),
            Some(previous) => {
                let delta_m = geodesic_distance(previous, fix);
                let elapsed_s = (fix.time - previous.time).num_milliseconds() as f64 / 1000.0;
                let velocity_mps = if elapsed_s > 0.0 {
                    delta_m / elapsed_s
                } else {
                    0.0
                };
                Step {
                    delta_m,
                    velocity_mps,
                }
            }
        };

        self.travelled_m += step.delta_m;
        self.previous = Some(fix.clone());
        step
    }

    /// Sum of all geodesic deltas seen so far.
    pub fn travelled_m(&self) -> f64 {
        self.travelled_m
    }
}
