//! Deterministic sampling of candidate source directions
//!
//! Three layouts are supported:
//!
//! - **Planar**: `G` points evenly spaced on the unit circle (zero elevation)
//! - **Sphere**: `G` points on a golden-angle spiral, near-uniform over the sphere
//! - **Hybrid** ("2.5D"): 360 points on the equator plus `G - 360` spiral points
//!   covering the upper hemisphere only, for arrays that are mostly horizontal
//!
//! # Example
//!
//! ```
//! use srp_doa::grid::{Grid, GridKind};
//!
//! let grid = Grid::new(GridKind::Planar, 72)?;
//! assert_eq!(grid.len(), 72);
//! let east = grid.direction(0);
//! assert!((east.azimuth - 0.0).abs() < 1e-6);
//! # Ok::<(), srp_doa::DoaError>(())
//! ```

use crate::error::DoaError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Points on the equator of a hybrid grid
pub const HYBRID_EQUATOR_POINTS: usize = 360;

/// Layout of the direction grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridKind {
    /// Unit circle in the horizontal plane
    #[serde(rename = "2d")]
    Planar,
    /// Full unit sphere
    #[serde(rename = "3d")]
    Sphere,
    /// Equatorial circle plus upper hemisphere
    #[serde(rename = "2.5d")]
    Hybrid,
}

/// One candidate direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    /// Azimuth in radians, `atan2(y, x)`, in `(-π, π]`
    pub azimuth: f32,
    /// Elevation in radians above the horizontal plane, in `[-π/2, π/2]`
    pub elevation: f32,
    /// Unit vector pointing from the array towards the source
    pub cartesian: [f32; 3],
}

impl Direction {
    /// Direction from a Cartesian vector; the vector is normalized
    pub fn from_cartesian(x: f64, y: f64, z: f64) -> Self {
        let norm = (x * x + y * y + z * z).sqrt();
        let (x, y, z) = if norm > 0.0 {
            (x / norm, y / norm, z / norm)
        } else {
            (1.0, 0.0, 0.0)
        };
        Self {
            azimuth: y.atan2(x) as f32,
            elevation: z.atan2((x * x + y * y).sqrt()) as f32,
            cartesian: [x as f32, y as f32, z as f32],
        }
    }

    /// Direction from spherical coordinates (radians)
    pub fn from_spherical(azimuth: f64, elevation: f64) -> Self {
        let (sin_el, cos_el) = elevation.sin_cos();
        Self::from_cartesian(cos_el * azimuth.cos(), cos_el * azimuth.sin(), sin_el)
    }

    /// Great-circle angle to another direction, in radians
    pub fn angle_to(&self, other: &Direction) -> f32 {
        let dot: f32 = self
            .cartesian
            .iter()
            .zip(&other.cartesian)
            .map(|(a, b)| a * b)
            .sum();
        dot.clamp(-1.0, 1.0).acos()
    }
}

/// Ordered, immutable set of candidate directions
#[derive(Debug, Clone)]
pub struct Grid {
    kind: GridKind,
    directions: Vec<Direction>,
}

impl Grid {
    /// Sample `size` directions with the given layout
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if `size` is zero, or smaller than
    /// [`HYBRID_EQUATOR_POINTS`] for a hybrid grid.
    pub fn new(kind: GridKind, size: usize) -> Result<Self, DoaError> {
        if size == 0 {
            return Err(DoaError::Configuration(
                "Grid size must be > 0".to_string(),
            ));
        }

        let directions = match kind {
            GridKind::Planar => sample_circle(size),
            GridKind::Sphere => sample_sphere(size),
            GridKind::Hybrid => {
                if size < HYBRID_EQUATOR_POINTS {
                    return Err(DoaError::Configuration(format!(
                        "Hybrid grid needs at least {} points, got {}",
                        HYBRID_EQUATOR_POINTS, size
                    )));
                }
                let mut directions = sample_circle(HYBRID_EQUATOR_POINTS);
                directions.extend(sample_upper_hemisphere(size - HYBRID_EQUATOR_POINTS));
                directions
            }
        };

        log::debug!("Sampled {:?} grid with {} directions", kind, directions.len());

        Ok(Self { kind, directions })
    }

    /// Layout this grid was sampled with
    pub fn kind(&self) -> GridKind {
        self.kind
    }

    /// Number of directions
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Always false: grids are never empty
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Direction at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn direction(&self, index: usize) -> &Direction {
        &self.directions[index]
    }

    /// All directions in scan order
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Index of the grid direction closest to `target`
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest(&self, target: &Direction) -> usize {
        let mut best = 0;
        let mut best_angle = f32::INFINITY;
        for (i, d) in self.directions.iter().enumerate() {
            let angle = d.angle_to(target);
            if angle < best_angle {
                best_angle = angle;
                best = i;
            }
        }
        best
    }
}

fn sample_circle(n_points: usize) -> Vec<Direction> {
    let omega = 2.0 * PI / n_points as f64;
    (0..n_points)
        .map(|n| {
            let angle = n as f64 * omega;
            Direction::from_cartesian(angle.cos(), angle.sin(), 0.0)
        })
        .collect()
}

/// Golden-angle spiral around the y axis
fn sample_sphere(n_points: usize) -> Vec<Direction> {
    let offset = 2.0 / n_points as f64;
    let increment = PI * (3.0 - 5.0f64.sqrt());
    (0..n_points)
        .map(|i| {
            let y = (i as f64 * offset - 1.0) + offset / 2.0;
            let rho = (1.0 - y * y).max(0.0).sqrt();
            let phi = i as f64 * increment;
            Direction::from_cartesian(phi.cos() * rho, y, phi.sin() * rho)
        })
        .collect()
}

/// Spiral over the lower half in y, rotated so its pole points up the z axis
fn sample_upper_hemisphere(n_points: usize) -> Vec<Direction> {
    if n_points == 0 {
        return Vec::new();
    }
    let offset = 1.0 / n_points as f64;
    let increment = PI * (3.0 - 5.0f64.sqrt());
    (0..n_points)
        .map(|i| {
            let y = (i as f64 * offset - 1.0) + offset / 2.0;
            let rho = (1.0 - y * y).max(0.0).sqrt();
            let phi = i as f64 * increment;
            let x = phi.cos() * rho;
            let z = phi.sin() * rho;
            Direction::from_cartesian(x, z, -y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_unit_norm_all_kinds() {
        for (kind, size) in [
            (GridKind::Planar, 37),
            (GridKind::Sphere, 500),
            (GridKind::Hybrid, 600),
        ] {
            let grid = Grid::new(kind, size).unwrap();
            assert_eq!(grid.len(), size);
            for (i, d) in grid.directions().iter().enumerate() {
                let n = norm(&d.cartesian);
                assert!(
                    (n - 1.0).abs() < 1e-5,
                    "{:?} point {} has norm {}",
                    kind,
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn test_planar_even_spacing() {
        let grid = Grid::new(GridKind::Planar, 8).unwrap();
        let step = std::f32::consts::PI / 4.0;
        for (i, d) in grid.directions().iter().enumerate() {
            assert_eq!(d.elevation, 0.0);
            assert_eq!(d.cartesian[2], 0.0);
            let next = grid.direction((i + 1) % 8);
            assert!((d.angle_to(next) - step).abs() < 1e-5);
        }
        assert!((grid.direction(2).azimuth - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_covers_both_hemispheres() {
        let grid = Grid::new(GridKind::Sphere, 200).unwrap();
        let up = grid.directions().iter().filter(|d| d.cartesian[2] > 0.0).count();
        let down = grid.directions().iter().filter(|d| d.cartesian[2] < 0.0).count();
        assert!(up > 80 && down > 80, "up={}, down={}", up, down);
    }

    #[test]
    fn test_sphere_is_deterministic() {
        let a = Grid::new(GridKind::Sphere, 100).unwrap();
        let b = Grid::new(GridKind::Sphere, 100).unwrap();
        assert_eq!(a.directions(), b.directions());
    }

    #[test]
    fn test_hybrid_layout() {
        let grid = Grid::new(GridKind::Hybrid, 460).unwrap();
        for d in &grid.directions()[..HYBRID_EQUATOR_POINTS] {
            assert_eq!(d.cartesian[2], 0.0);
        }
        for d in &grid.directions()[HYBRID_EQUATOR_POINTS..] {
            assert!(d.cartesian[2] > 0.0, "top point below equator: {:?}", d);
            assert!(d.elevation > 0.0);
        }
    }

    #[test]
    fn test_hybrid_too_small() {
        assert!(matches!(
            Grid::new(GridKind::Hybrid, 100),
            Err(DoaError::Configuration(_))
        ));
        // Exactly the equator is allowed
        assert_eq!(Grid::new(GridKind::Hybrid, 360).unwrap().len(), 360);
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(Grid::new(GridKind::Planar, 0).is_err());
    }

    #[test]
    fn test_nearest() {
        let grid = Grid::new(GridKind::Planar, 36).unwrap();
        let target = Direction::from_spherical(52.0f64.to_radians(), 0.0);
        assert_eq!(grid.nearest(&target), 5);
    }
}
