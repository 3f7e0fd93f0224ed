//! Per-block localization result

use crate::grid::Direction;
use serde::{Deserialize, Serialize};

/// Direction estimate for one processed block
///
/// A plain value meant for telemetry: copy it out, log it, serialize it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoaEstimate {
    /// Index of the best grid direction
    pub index: usize,

    /// Azimuth of that direction in radians
    pub azimuth: f32,

    /// Elevation of that direction in radians
    pub elevation: f32,

    /// Spatial spectrum value at `index`
    pub power: f32,

    /// True once the trailing window holds its full `n_frames` frames
    pub primed: bool,
}

impl DoaEstimate {
    pub(crate) fn new(index: usize, direction: &Direction, power: f32, primed: bool) -> Self {
        Self {
            index,
            azimuth: direction.azimuth,
            elevation: direction.elevation,
            power,
            primed,
        }
    }

    /// Azimuth in degrees
    pub fn azimuth_degrees(&self) -> f32 {
        self.azimuth.to_degrees()
    }

    /// Elevation in degrees
    pub fn elevation_degrees(&self) -> f32 {
        self.elevation.to_degrees()
    }
}
