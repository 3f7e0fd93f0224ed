//! Steered response power with phase transform (SRP-PHAT)
//!
//! Algorithm:
//! 1. Keep `G[p, k]`, the sum of `X_i·conj(X_j)` over the last `n_frames`
//!    frames for every microphone pair `p = (i, j)` and band bin `k`. Each
//!    block adds the newest frame and subtracts the one leaving the window.
//! 2. Whiten: `G / |G|` (entries below [`MIN_CROSS_POWER`] contribute nothing)
//! 3. For every grid direction `n`: `S(n) = Σ_p Σ_k whitened[p, k]·steer(n, p, k)`
//! 4. Spatial spectrum is `|S(n)|²`; the estimate is its first maximum

use super::estimate::DoaEstimate;
use super::steering::SteeringTable;
use crate::config::LocalizerConfig;
use crate::error::DoaError;
use crate::geometry::MicArray;
use crate::grid::Grid;
use crate::stft::{SpectralFrame, SpectralHistory};
use rustfft::num_complex::{Complex32, Complex64};

/// Cross-power magnitude at or below which an entry is treated as silent
pub const MIN_CROSS_POWER: f64 = 1e-5;

/// Online SRP-PHAT localizer over a fixed direction grid
///
/// Reads frames from a [`SpectralHistory`] owned by the caller. Exactly one
/// `transform()` on the history must precede each [`process`](Self::process).
#[derive(Debug, Clone)]
pub struct SrpPhat {
    config: LocalizerConfig,
    grid: Grid,
    pairs: Vec<(usize, usize)>,
    steering: SteeringTable,

    /// Running sums, indexed `p * k_len + k`
    ///
    /// Kept in double precision so that adding a frame and later removing it
    /// cancels below [`MIN_CROSS_POWER`].
    cross_power: Vec<Complex64>,
    whitened: Vec<Complex32>,
    spectrum: Vec<f32>,

    best: usize,
    /// Frames currently summed in `cross_power` (at most `n_frames`)
    accumulated: usize,
    /// History frame count at the last `process()`
    last_frame: Option<u64>,
    since_resync: usize,
}

impl SrpPhat {
    /// Build the grid and steering table for `mics` reading from `history`
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if the configuration is invalid, the
    /// microphone count differs from the history's channel count, the
    /// transform sizes differ, or the history cannot hold `n_frames + 1`
    /// frames.
    pub fn new(
        config: &LocalizerConfig,
        mics: &MicArray,
        history: &SpectralHistory,
    ) -> Result<Self, DoaError> {
        config.validate()?;

        if mics.len() != history.channels() {
            return Err(DoaError::Configuration(format!(
                "Geometry has {} microphones but the spectral history has {} channels",
                mics.len(),
                history.channels()
            )));
        }

        if history.fft_size() != config.fft_size {
            return Err(DoaError::Configuration(format!(
                "Spectral history uses a {}-point transform, configuration expects {}",
                history.fft_size(),
                config.fft_size
            )));
        }

        if history.capacity() < config.n_frames + 1 {
            return Err(DoaError::Configuration(format!(
                "Spectral history holds {} frames, need at least {} for a {}-frame window",
                history.capacity(),
                config.n_frames + 1,
                config.n_frames
            )));
        }

        let grid = Grid::new(config.grid_kind, config.grid_size)?;
        let pairs = mics.pairs();
        let steering = SteeringTable::new(config, mics, &pairs, &grid);

        let top_frequency = config.bin_frequency(config.k_len - 1);
        let aperture = mics.aperture();
        if aperture * top_frequency / config.sound_speed > 0.5 {
            log::warn!(
                "Array aperture {:.3} m exceeds half a wavelength at {:.0} Hz; expect spatial aliasing",
                aperture,
                top_frequency
            );
        }

        let entries = pairs.len() * config.k_len;
        log::debug!(
            "SRP-PHAT: {} microphones, {} pairs, bins [{}, {}), {}-frame window, {} directions",
            mics.len(),
            pairs.len(),
            config.k_min,
            config.k_min + config.k_len,
            config.n_frames,
            grid.len()
        );

        Ok(Self {
            config: config.clone(),
            spectrum: vec![0.0; grid.len()],
            grid,
            pairs,
            steering,
            cross_power: vec![Complex64::new(0.0, 0.0); entries],
            whitened: vec![Complex32::new(0.0, 0.0); entries],
            best: 0,
            accumulated: 0,
            last_frame: None,
            since_resync: 0,
        })
    }

    /// Fold the newest history frame into the window and rescan the grid
    ///
    /// Returns the index of the best direction.
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if the history has no frame
    /// since the previous call, or more than one.
    pub fn process(&mut self, history: &SpectralHistory) -> Result<usize, DoaError> {
        let transformed = history.frames_transformed();
        match self.last_frame {
            None if transformed == 0 => {
                return Err(DoaError::ContractViolation(
                    "process() called before any frame was transformed".to_string(),
                ));
            }
            Some(last) if transformed == last => {
                return Err(DoaError::ContractViolation(
                    "process() called without a new frame since the last call".to_string(),
                ));
            }
            Some(last) if transformed != last + 1 => {
                return Err(DoaError::ContractViolation(format!(
                    "Expected exactly one new frame, history advanced from {} to {}",
                    last, transformed
                )));
            }
            _ => {}
        }

        self.slide(history)?;
        self.last_frame = Some(transformed);

        if self.config.resync_interval > 0 {
            self.since_resync += 1;
            if self.since_resync >= self.config.resync_interval {
                self.rebuild_cross_power(history)?;
            }
        }

        self.whiten();
        self.scan();

        log::trace!(
            "SRP-PHAT frame {}: best direction {} (power {:.3})",
            transformed,
            self.best,
            self.spectrum[self.best]
        );

        Ok(self.best)
    }

    /// Add the newest frame, subtract the one leaving the window
    fn slide(&mut self, history: &SpectralHistory) -> Result<(), DoaError> {
        let k_min = self.config.k_min;
        let k_len = self.config.k_len;
        let n_frames = self.config.n_frames;

        let newest = history.frame(0)?;
        let outgoing = if self.accumulated >= n_frames {
            Some(history.frame(n_frames)?)
        } else {
            None
        };

        for (p, &(i, j)) in self.pairs.iter().enumerate() {
            let sums = &mut self.cross_power[p * k_len..(p + 1) * k_len];
            for (k, sum) in sums.iter_mut().enumerate() {
                let bin = k_min + k;
                *sum += cross_spectrum(newest, bin, i, j);
                if let Some(old) = outgoing {
                    *sum -= cross_spectrum(old, bin, i, j);
                }
            }
        }

        self.accumulated = (self.accumulated + 1).min(n_frames);
        Ok(())
    }

    fn whiten(&mut self) {
        for (w, g) in self.whitened.iter_mut().zip(&self.cross_power) {
            let magnitude = g.norm();
            *w = if magnitude > MIN_CROSS_POWER {
                let unit = *g / magnitude;
                Complex32::new(unit.re as f32, unit.im as f32)
            } else {
                Complex32::new(0.0, 0.0)
            };
        }
    }

    fn scan(&mut self) {
        let mut best = 0;
        let mut best_power = f32::NEG_INFINITY;
        for (n, power) in self.spectrum.iter_mut().enumerate() {
            let response: Complex32 = self
                .steering
                .row(n)
                .iter()
                .zip(&self.whitened)
                .map(|(s, w)| s * w)
                .sum();
            *power = response.norm_sqr();
            if *power > best_power {
                best_power = *power;
                best = n;
            }
        }
        self.best = best;
    }

    /// Recompute the window sums exactly from the history
    ///
    /// Sums the last `min(frames processed, n_frames)` frames directly,
    /// discarding any rounding drift of the sliding update.
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if the history no longer holds
    /// those frames.
    pub fn rebuild_cross_power(&mut self, history: &SpectralHistory) -> Result<(), DoaError> {
        let k_min = self.config.k_min;
        let k_len = self.config.k_len;

        self.cross_power.fill(Complex64::new(0.0, 0.0));
        for age in 0..self.accumulated {
            let frame = history.frame(age)?;
            for (p, &(i, j)) in self.pairs.iter().enumerate() {
                for k in 0..k_len {
                    let bin = k_min + k;
                    self.cross_power[p * k_len + k] += cross_spectrum(frame, bin, i, j);
                }
            }
        }
        self.since_resync = 0;
        Ok(())
    }

    /// Spatial spectrum from the last `process()`, one value per direction
    pub fn spatial_spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Best direction index from the last `process()` (0 before the first)
    pub fn best_index(&self) -> usize {
        self.best
    }

    /// Estimate from the last `process()`
    pub fn estimate(&self) -> DoaEstimate {
        DoaEstimate::new(
            self.best,
            self.grid.direction(self.best),
            self.spectrum[self.best],
            self.is_primed(),
        )
    }

    /// True once the window holds `n_frames` frames
    pub fn is_primed(&self) -> bool {
        self.accumulated >= self.config.n_frames
    }

    /// Frames currently summed in the window
    pub fn frames_accumulated(&self) -> usize {
        self.accumulated
    }

    /// Candidate directions
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Microphone pairs in accumulator order
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Precomputed steering phases
    pub fn steering(&self) -> &SteeringTable {
        &self.steering
    }

    /// Window sums, indexed `p * k_len + k`
    pub fn cross_power(&self) -> &[Complex64] {
        &self.cross_power
    }

    /// Localizer configuration
    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Clear the window and spectrum
    ///
    /// The next `process()` accepts whatever frame the history holds newest,
    /// so the history should be reset alongside.
    pub fn reset(&mut self) {
        self.cross_power.fill(Complex64::new(0.0, 0.0));
        self.whitened.fill(Complex32::new(0.0, 0.0));
        self.spectrum.fill(0.0);
        self.best = 0;
        self.accumulated = 0;
        self.last_frame = None;
        self.since_resync = 0;
    }
}

/// `X_i · conj(X_j)` at `bin`, widened to double precision
#[inline]
fn cross_spectrum(frame: &SpectralFrame, bin: usize, i: usize, j: usize) -> Complex64 {
    let xi = frame.get(bin, i);
    let xj = frame.get(bin, j);
    Complex64::new(xi.re as f64, xi.im as f64) * Complex64::new(xj.re as f64, -(xj.im as f64))
}
