//! Analysis and synthesis windows
//!
//! The analysis window is a periodic Hann window. The synthesis window is
//! derived from a reference analysis window and a hop (shift) so that the
//! product of the two windows overlap-adds to exactly one:
//!
//! ```text
//! Σ_t a[m - tS] · s[m - tS] = 1   for every sample offset m
//! ```
//!
//! This is the complementary window of Griffin & Lim (1984), obtained by
//! dividing the reference window by the overlap sum of its squared shifts.
//!
//! # Example
//!
//! ```
//! use srp_doa::window::Window;
//!
//! let analysis = Window::hann(128);
//! let synthesis = Window::complementary(&analysis, 32);
//! let gain = analysis.overlap_gain(&synthesis, 32);
//! assert!(gain.iter().all(|g| (g - 1.0).abs() < 1e-5));
//! ```

use serde::{Deserialize, Serialize};

/// Overlap sums below this are treated as zero when deriving a synthesis window
const EPSILON: f32 = 1e-10;

/// Which windows the spectral engine applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Rectangular analysis, no synthesis window
    #[default]
    None,
    /// Hann analysis window only
    Analysis,
    /// Hann analysis window plus its complementary synthesis window
    AnalysisSynthesis,
}

impl WindowMode {
    /// Whether an analysis window is applied before the forward transform
    pub fn has_analysis(self) -> bool {
        !matches!(self, WindowMode::None)
    }

    /// Whether a synthesis window is applied after the inverse transform
    pub fn has_synthesis(self) -> bool {
        matches!(self, WindowMode::AnalysisSynthesis)
    }
}

/// Immutable sequence of window gain coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    coefficients: Vec<f32>,
}

impl Window {
    /// Periodic Hann window: `w[n] = 0.5 · (1 - cos(2πn / N))`
    pub fn hann(size: usize) -> Self {
        let n_inv = 1.0 / size as f64;
        let coefficients = (0..size)
            .map(|n| (0.5 * (1.0 - (2.0 * std::f64::consts::PI * n_inv * n as f64).cos())) as f32)
            .collect();
        Self { coefficients }
    }

    /// Synthesis window complementary to `reference` for hop `shift`
    ///
    /// Every sample of the result is `reference[m] / Σ_t reference[m - tS]²`,
    /// where the sum runs over all shifts of the reference window that still
    /// overlap sample `m`. Samples whose overlap sum vanishes are set to zero.
    ///
    /// # Arguments
    ///
    /// * `reference` - The analysis window the result must complement
    /// * `shift` - Hop between consecutive frames, in samples (> 0)
    pub fn complementary(reference: &Window, shift: usize) -> Self {
        let size = reference.len();
        let shift = shift.max(1) as isize;
        let len = size as isize;
        let mut norm = vec![0.0f64; size];

        // Earliest shift that still overlaps the frame
        let mut offset = 0isize;
        while offset - shift > -len {
            offset -= shift;
        }

        while offset < len {
            let start = offset.max(0);
            let end = (offset + len).min(len);
            for m in start..end {
                let w = reference.coefficients[(m - offset) as usize] as f64;
                norm[m as usize] += w * w;
            }
            offset += shift;
        }

        let coefficients = reference
            .coefficients
            .iter()
            .zip(&norm)
            .map(|(&w, &n)| {
                if n > EPSILON as f64 {
                    (w as f64 / n) as f32
                } else {
                    0.0
                }
            })
            .collect();

        Self { coefficients }
    }

    /// Number of coefficients
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// True for a zero-length window
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Coefficients as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.coefficients
    }

    /// Multiply `samples` in place by the window
    ///
    /// `samples` must have the same length as the window; extra samples on
    /// either side are left untouched.
    pub fn apply(&self, samples: &mut [f32]) {
        for (x, &w) in samples.iter_mut().zip(&self.coefficients) {
            *x *= w;
        }
    }

    /// Overlap-add gain of `self · other` at hop `shift`, one value per sample offset
    ///
    /// A pair satisfies the constant overlap-add condition when every entry
    /// is the same constant (1.0 for a complementary pair).
    pub fn overlap_gain(&self, other: &Window, shift: usize) -> Vec<f32> {
        let size = self.len().min(other.len());
        let shift = shift.max(1);
        let mut gain = vec![0.0f32; shift];
        for m in 0..size {
            gain[m % shift] += self.coefficients[m] * other.coefficients[m];
        }
        gain
    }
}

impl std::ops::Index<usize> for Window {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.coefficients[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values computed offline in double precision
    const H16: [f32; 16] = [
        0.0, 0.03806023, 0.14644661, 0.30865828, 0.5, 0.69134172, 0.85355339, 0.96193977, 1.0,
        0.96193977, 0.85355339, 0.69134172, 0.5, 0.30865828, 0.14644661, 0.03806023,
    ];

    const H16_S2: [f32; 16] = [
        0.0, 0.01268674, 0.04881554, 0.10288609, 0.16666667, 0.23044724, 0.2845178, 0.32064659,
        0.33333333, 0.32064659, 0.2845178, 0.23044724, 0.16666667, 0.10288609, 0.04881554,
        0.01268674,
    ];

    const H16_S4: [f32; 16] = [
        0.0, 0.02537349, 0.09763107, 0.20577219, 0.33333333, 0.46089448, 0.56903559, 0.64129318,
        0.66666667, 0.64129318, 0.56903559, 0.46089448, 0.33333333, 0.20577219, 0.09763107,
        0.02537349,
    ];

    const H16_S6: [f32; 16] = [
        0.0, 0.03723923, 0.1404234, 0.3020002, 0.51095832, 0.72323135, 0.87226042, 0.9411897,
        0.95887094, 0.9411897, 0.87226042, 0.72323135, 0.51095832, 0.3020002, 0.1404234,
        0.03723923,
    ];

    const H16_S12: [f32; 16] = [
        0.0, 0.39351548, 3.41421356, 3.19130495, 2.0, 1.44646269, 1.17157288, 1.03956613, 1.0,
        1.03956613, 1.17157288, 1.44646269, 2.0, 3.19130495, 3.41421356, 0.39351548,
    ];

    fn assert_close(window: &Window, expected: &[f32], tol: f32) {
        assert_eq!(window.len(), expected.len());
        for (i, (&got, &want)) in window.as_slice().iter().zip(expected).enumerate() {
            assert!(
                (got - want).abs() < tol,
                "coefficient {}: expected {}, got {}",
                i,
                want,
                got
            );
        }
    }

    #[test]
    fn test_hann_16() {
        assert_close(&Window::hann(16), &H16, 1e-5);
    }

    #[test]
    fn test_hann_is_periodic() {
        let w = Window::hann(128);
        assert_eq!(w[0], 0.0);
        assert!((w[64] - 1.0).abs() < 1e-6);
        // Periodic: w[n] == w[N - n]
        for n in 1..64 {
            assert!((w[n] - w[128 - n]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_complementary_matches_reference() {
        let hann = Window::hann(16);
        assert_close(&Window::complementary(&hann, 2), &H16_S2, 1e-5);
        assert_close(&Window::complementary(&hann, 4), &H16_S4, 1e-5);
        assert_close(&Window::complementary(&hann, 6), &H16_S6, 1e-5);
        assert_close(&Window::complementary(&hann, 12), &H16_S12, 1e-4);
    }

    #[test]
    fn test_complementary_long_window() {
        let hann = Window::hann(128);
        let gl = Window::complementary(&hann, 64);
        assert!((gl[64] - 1.0).abs() < 1e-5);
        assert!((gl[1] - 6.02997797e-04).abs() < 1e-6);
        assert!((gl[40] - 1.20606003).abs() < 1e-5);
    }

    #[test]
    fn test_complementary_pair_is_cola() {
        let hann = Window::hann(128);
        for shift in [16, 32, 64, 88, 100] {
            let synthesis = Window::complementary(&hann, shift);
            let gain = hann.overlap_gain(&synthesis, shift);
            for (m, g) in gain.iter().enumerate() {
                assert!(
                    (g - 1.0).abs() < 1e-4,
                    "shift {}: gain at offset {} is {}",
                    shift,
                    m,
                    g
                );
            }
        }
    }

    #[test]
    fn test_window_mode_flags() {
        assert!(!WindowMode::None.has_analysis());
        assert!(WindowMode::Analysis.has_analysis());
        assert!(!WindowMode::Analysis.has_synthesis());
        assert!(WindowMode::AnalysisSynthesis.has_synthesis());
    }
}
