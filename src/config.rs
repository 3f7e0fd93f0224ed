//! Configuration parameters for the localizer

use crate::error::DoaError;
use crate::grid::{GridKind, HYBRID_EQUATOR_POINTS};
use crate::window::WindowMode;
use serde::{Deserialize, Serialize};

/// Localizer configuration parameters
///
/// Fixed for the lifetime of a localizer instance. The microphone count is
/// not part of the configuration: it comes from the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    // Transform
    /// Transform size and block length in samples (default: 128)
    pub fft_size: usize,

    /// Window applied to each block before the transform (default: None)
    pub window: WindowMode,

    /// Sampling rate in Hz (default: 16000.0)
    pub sample_rate: f32,

    /// Speed of sound in m/s (default: 343.0)
    pub sound_speed: f32,

    // Band
    /// First frequency bin used for localization (default: 30)
    pub k_min: usize,

    /// Number of consecutive bins used (default: 15)
    pub k_len: usize,

    // Accumulation
    /// Trailing window length in frames for the cross-power sums (default: 8)
    pub n_frames: usize,

    /// Recompute the cross-power sums exactly every this many blocks,
    /// 0 to rely on the sliding update only (default: 0)
    pub resync_interval: usize,

    /// Extra frames of spectral history kept beyond what the trailing window
    /// needs, for other consumers of the same history (default: 0)
    pub extra_history: usize,

    // Search
    /// Number of candidate directions (default: 18)
    pub grid_size: usize,

    /// Layout of the candidate directions (default: Planar)
    pub grid_kind: GridKind,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            fft_size: 128,
            window: WindowMode::None,
            sample_rate: 16000.0,
            sound_speed: 343.0,
            k_min: 30,
            k_len: 15,
            n_frames: 8,
            resync_interval: 0,
            extra_history: 0,
            grid_size: 18,
            grid_kind: GridKind::Planar,
        }
    }
}

impl LocalizerConfig {
    /// Number of bins in a spectral frame (`fft_size / 2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Ring capacity needed to read the frame leaving the trailing window
    pub fn history_capacity(&self) -> usize {
        self.n_frames + 1 + self.extra_history
    }

    /// Centre frequency in Hz of band bin `k` (`0 <= k < k_len`)
    pub fn bin_frequency(&self, k: usize) -> f32 {
        (self.k_min + k) as f32 / self.fft_size as f32 * self.sample_rate
    }

    /// Check every parameter, reporting the first problem found
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` describing the invalid parameter.
    pub fn validate(&self) -> Result<(), DoaError> {
        if self.fft_size < 2 {
            return Err(DoaError::Configuration(format!(
                "FFT size must be >= 2, got {}",
                self.fft_size
            )));
        }

        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DoaError::Configuration(format!(
                "Sample rate must be > 0, got {}",
                self.sample_rate
            )));
        }

        if !(self.sound_speed.is_finite() && self.sound_speed > 0.0) {
            return Err(DoaError::Configuration(format!(
                "Speed of sound must be > 0, got {}",
                self.sound_speed
            )));
        }

        if self.k_len == 0 {
            return Err(DoaError::Configuration(
                "Frequency band must contain at least one bin".to_string(),
            ));
        }

        if self.k_min + self.k_len > self.num_bins() {
            return Err(DoaError::Configuration(format!(
                "Frequency band [{}, {}) exceeds the {} bins of a {}-point transform",
                self.k_min,
                self.k_min + self.k_len,
                self.num_bins(),
                self.fft_size
            )));
        }

        if self.n_frames == 0 {
            return Err(DoaError::Configuration(
                "Trailing window must be at least one frame".to_string(),
            ));
        }

        if self.grid_size == 0 {
            return Err(DoaError::Configuration(
                "Grid size must be > 0".to_string(),
            ));
        }

        if self.grid_kind == GridKind::Hybrid && self.grid_size < HYBRID_EQUATOR_POINTS {
            return Err(DoaError::Configuration(format!(
                "Hybrid grid needs at least {} points, got {}",
                HYBRID_EQUATOR_POINTS, self.grid_size
            )));
        }

        if self.k_min == 0 {
            log::warn!("Frequency band includes the DC bin, which carries no direction information");
        }

        Ok(())
    }
}
