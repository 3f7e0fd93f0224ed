//! # srp-doa
//!
//! Real-time direction-of-arrival estimation for microphone arrays, built on a
//! streaming short-time Fourier transform.
//!
//! ## Features
//!
//! - **Streaming STFT**: block-in analysis with overlap-add resynthesis and a
//!   bounded look-back over past frames
//! - **Windows**: periodic Hann analysis window and its complementary
//!   synthesis window for perfect reconstruction
//! - **Direction grids**: planar circle, golden-angle sphere, or equator plus
//!   upper hemisphere
//! - **SRP-PHAT**: sliding-window cross-power accumulation, phase transform
//!   whitening and an exhaustive grid scan every block
//!
//! ## Quick Start
//!
//! ```no_run
//! use srp_doa::{DoaTracker, LocalizerConfig, MicArray};
//!
//! let mics = MicArray::circular(4, 0.032)?;
//! let mut tracker = DoaTracker::new(LocalizerConfig::default(), &mics)?;
//!
//! // One block = fft_size frames of interleaved samples
//! let block = vec![0.0f32; 4 * 128];
//! let estimate = tracker.process_block(&block)?;
//! println!("Azimuth: {:.1}°", estimate.azimuth_degrees());
//! # Ok::<(), srp_doa::DoaError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Geometry + Grid → Steering table (once)
//! Audio block → SpectralHistory::transform → SrpPhat::process → DoaEstimate + spatial spectrum
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod localization;
pub mod stft;
pub mod window;

// Re-export main types
pub use config::LocalizerConfig;
pub use error::DoaError;
pub use geometry::{parse_geometry, MicArray};
pub use grid::{Direction, Grid, GridKind};
pub use localization::{DoaEstimate, SrpPhat};
pub use stft::{SpectralEngine, SpectralHistory, StftConfig};
pub use window::{Window, WindowMode};

/// Block-driven localizer: one spectral history feeding one SRP-PHAT instance
///
/// Each call to [`process_block`](Self::process_block) transforms one block
/// and updates the estimate, so the transform/process ordering can never be
/// broken.
///
/// # Example
///
/// ```no_run
/// use srp_doa::{parse_geometry, DoaTracker, LocalizerConfig};
///
/// let geometry = std::fs::read_to_string("array.txt")?;
/// let mics = parse_geometry(&geometry, 4)?;
/// let _tracker = DoaTracker::new(LocalizerConfig::default(), &mics)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct DoaTracker {
    history: SpectralHistory,
    localizer: SrpPhat,
}

impl DoaTracker {
    /// Build the spectral history and localizer for `mics`
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if `config` is invalid.
    pub fn new(config: LocalizerConfig, mics: &MicArray) -> Result<Self, DoaError> {
        let history = SpectralHistory::lookback(
            config.fft_size,
            mics.len(),
            config.history_capacity(),
            config.window,
        )?;
        let localizer = SrpPhat::new(&config, mics, &history)?;

        log::debug!(
            "DOA tracker ready: {} channels, blocks of {} samples",
            mics.len(),
            config.fft_size
        );

        Ok(Self { history, localizer })
    }

    /// Transform one interleaved block and localize
    ///
    /// # Arguments
    ///
    /// * `block` - `channels × fft_size` interleaved samples
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if the block has the wrong length.
    pub fn process_block(&mut self, block: &[f32]) -> Result<DoaEstimate, DoaError> {
        self.history.transform(block)?;
        self.localizer.process(&self.history)?;
        Ok(self.localizer.estimate())
    }

    /// Spatial spectrum of the last block
    pub fn spatial_spectrum(&self) -> &[f32] {
        self.localizer.spatial_spectrum()
    }

    /// Candidate directions
    pub fn grid(&self) -> &Grid {
        self.localizer.grid()
    }

    /// Samples per interleaved block
    pub fn block_len(&self) -> usize {
        self.history.channels() * self.history.fft_size()
    }

    /// Spectral history, for other consumers of the same frames
    pub fn history(&self) -> &SpectralHistory {
        &self.history
    }

    /// The localizer
    pub fn localizer(&self) -> &SrpPhat {
        &self.localizer
    }

    /// Restart the stream
    pub fn reset(&mut self) {
        self.history.reset();
        self.localizer.reset();
    }
}
