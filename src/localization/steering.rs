//! Precomputed far-field steering phases

use crate::config::LocalizerConfig;
use crate::geometry::MicArray;
use crate::grid::Grid;
use rustfft::num_complex::Complex32;
use std::f64::consts::PI;

/// Phase factor for every (direction, pair, band bin)
///
/// Entry `(n, p, k)` is `exp(i·2π·f_k·⟨x_j − x_i, d_n⟩ / c)` for pair
/// `p = (i, j)`, which cancels the phase of the cross-spectrum
/// `X_i·conj(X_j)` of a plane wave arriving from `d_n`.
///
/// Layout is direction-major, then pair, then bin, so one direction's
/// factors are contiguous for the scan.
#[derive(Debug, Clone)]
pub struct SteeringTable {
    n_directions: usize,
    n_pairs: usize,
    n_bins: usize,
    phases: Vec<Complex32>,
}

impl SteeringTable {
    /// Build the table for `grid`, the array `pairs`, and the band in `config`
    pub fn new(
        config: &LocalizerConfig,
        mics: &MicArray,
        pairs: &[(usize, usize)],
        grid: &Grid,
    ) -> Self {
        let n_directions = grid.len();
        let n_pairs = pairs.len();
        let n_bins = config.k_len;

        // Phases are formed in f64: the argument grows with frequency and
        // baseline and f32 loses the fractional turn
        let frequencies: Vec<f64> = (0..n_bins)
            .map(|k| (config.k_min + k) as f64 / config.fft_size as f64 * config.sample_rate as f64)
            .collect();
        let sound_speed = config.sound_speed as f64;

        let mut phases = Vec::with_capacity(n_directions * n_pairs * n_bins);
        for direction in grid.directions() {
            let d = direction.cartesian;
            for &(i, j) in pairs {
                let b = mics.baseline(i, j);
                let delay = (b[0] as f64 * d[0] as f64
                    + b[1] as f64 * d[1] as f64
                    + b[2] as f64 * d[2] as f64)
                    / sound_speed;
                for &f in &frequencies {
                    let (sin, cos) = (2.0 * PI * f * delay).sin_cos();
                    phases.push(Complex32::new(cos as f32, sin as f32));
                }
            }
        }

        log::debug!(
            "Steering table: {} directions × {} pairs × {} bins",
            n_directions,
            n_pairs,
            n_bins
        );

        Self {
            n_directions,
            n_pairs,
            n_bins,
            phases,
        }
    }

    /// Factors of direction `n`, indexed `p * n_bins + k`
    #[inline]
    pub fn row(&self, n: usize) -> &[Complex32] {
        let stride = self.n_pairs * self.n_bins;
        &self.phases[n * stride..(n + 1) * stride]
    }

    /// Factor for direction `n`, pair `p`, band bin `k`
    #[inline]
    pub fn get(&self, n: usize, p: usize, k: usize) -> Complex32 {
        self.phases[(n * self.n_pairs + p) * self.n_bins + k]
    }

    /// Number of directions
    pub fn n_directions(&self) -> usize {
        self.n_directions
    }

    /// Number of microphone pairs
    pub fn n_pairs(&self) -> usize {
        self.n_pairs
    }

    /// Number of band bins
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridKind;

    #[test]
    fn test_zero_baseline_is_unity() {
        let config = LocalizerConfig::default();
        let mics = MicArray::new(vec![[0.1, 0.2, 0.3], [0.1, 0.2, 0.3], [0.0, 0.0, 0.0]]).unwrap();
        let pairs = mics.pairs();
        let grid = Grid::new(GridKind::Sphere, 50).unwrap();
        let table = SteeringTable::new(&config, &mics, &pairs, &grid);

        for n in 0..grid.len() {
            for k in 0..config.k_len {
                assert_eq!(table.get(n, 0, k), Complex32::new(1.0, 0.0));
            }
        }
    }

    #[test]
    fn test_phase_matches_delay() {
        let config = LocalizerConfig::default();
        let mics = MicArray::new(vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0]]).unwrap();
        let pairs = mics.pairs();
        let grid = Grid::new(GridKind::Planar, 4).unwrap();
        let table = SteeringTable::new(&config, &mics, &pairs, &grid);

        assert_eq!(table.row(1).len(), config.k_len);
        for k in 0..config.k_len {
            let f = config.bin_frequency(k);
            let expected = 2.0 * std::f32::consts::PI * f * 0.1 / config.sound_speed;
            let along = table.get(0, 0, k);
            let diff = (along - Complex32::from_polar(1.0, expected)).norm();
            assert!(diff < 1e-3, "k={}: {} vs phase {}", k, along, expected);

            // Broadside: no delay
            let broadside = table.get(1, 0, k);
            assert!((broadside.re - 1.0).abs() < 1e-5, "k={}: {}", k, broadside);
        }
    }
}
