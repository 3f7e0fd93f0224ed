//! Continuous STFT analysis and overlap-add synthesis
//!
//! Each call to [`SpectralEngine::analyze`] consumes one block of `S` new
//! samples per channel and builds a transform buffer of `F` samples:
//!
//! ```text
//! | zb zeros | carried tail (N - S) | new block (S) | ze zeros |
//!            |<------------ data region N ------------>|
//! ```
//!
//! The analysis window covers the data region only. [`SpectralEngine::synthesize`]
//! inverse-transforms the current frame, applies the synthesis window over the
//! same region, and overlap-adds into an output tail of `F - S` samples.
//!
//! With a Hann analysis window and its complementary synthesis window the
//! output is the input delayed by `zb + N - S` samples (`F - S` without
//! padding).
//!
//! # Example
//!
//! ```
//! use srp_doa::stft::{SpectralEngine, StftConfig};
//! use srp_doa::window::WindowMode;
//!
//! let config = StftConfig::new(64, 256, 2).with_window(WindowMode::AnalysisSynthesis);
//! let mut engine = SpectralEngine::new(config)?;
//!
//! let block = vec![0.0f32; 2 * 64];
//! let mut out = vec![0.0f32; 2 * 64];
//! engine.analyze(&block)?;
//! engine.synthesize(&mut out)?;
//! # Ok::<(), srp_doa::DoaError>(())
//! ```

use super::frame::SpectralFrame;
use crate::error::DoaError;
use crate::window::{Window, WindowMode};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use std::sync::Arc;

/// Construction parameters of a [`SpectralEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct StftConfig {
    /// New samples per channel per block (`S`)
    pub shift: usize,
    /// Transform size (`F`)
    pub fft_size: usize,
    /// Zeros placed before the data region
    pub zero_pad_front: usize,
    /// Zeros placed after the data region
    pub zero_pad_back: usize,
    /// Number of interleaved channels
    pub channels: usize,
    /// Windows to apply
    pub window: WindowMode,
}

impl StftConfig {
    /// Configuration without zero padding or windows
    pub fn new(shift: usize, fft_size: usize, channels: usize) -> Self {
        Self {
            shift,
            fft_size,
            zero_pad_front: 0,
            zero_pad_back: 0,
            channels,
            window: WindowMode::None,
        }
    }

    /// Set the leading and trailing zero padding
    pub fn with_zero_padding(mut self, front: usize, back: usize) -> Self {
        self.zero_pad_front = front;
        self.zero_pad_back = back;
        self
    }

    /// Set the window mode
    pub fn with_window(mut self, window: WindowMode) -> Self {
        self.window = window;
        self
    }

    /// Length of the data region (`N = F - zb - ze`), 0 if padding exceeds `F`
    pub fn frame_len(&self) -> usize {
        self.fft_size
            .saturating_sub(self.zero_pad_front + self.zero_pad_back)
    }

    /// Bins per channel in a frame
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Samples in one interleaved block (`channels × shift`)
    pub fn block_len(&self) -> usize {
        self.channels * self.shift
    }

    /// Analysis-to-synthesis delay in samples
    pub fn delay(&self) -> usize {
        self.zero_pad_front + self.frame_len() - self.shift
    }

    fn validate(&self) -> Result<(), DoaError> {
        if self.channels == 0 {
            return Err(DoaError::Configuration(
                "Channel count must be > 0".to_string(),
            ));
        }

        if self.shift == 0 {
            return Err(DoaError::Configuration("Shift must be > 0".to_string()));
        }

        if self.zero_pad_front + self.zero_pad_back + self.shift > self.fft_size {
            return Err(DoaError::Configuration(format!(
                "Shift {} plus zero padding {}+{} exceeds transform size {}",
                self.shift, self.zero_pad_front, self.zero_pad_back, self.fft_size
            )));
        }

        Ok(())
    }
}

/// Streaming multichannel STFT with overlap-add resynthesis
///
/// Not reentrant: `analyze` must be called exactly once per block, in
/// stream order. All buffers are allocated at construction.
pub struct SpectralEngine {
    config: StftConfig,
    frame_len: usize,

    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    analysis_window: Option<Window>,
    synthesis_window: Option<Window>,

    /// Last `N - S` input samples per channel
    input_tail: Vec<f32>,
    /// Pending overlap-add samples per channel (`F - S`)
    output_tail: Vec<f32>,
    /// Unwindowed transform buffers, channel-major (`C × F`)
    time_frame: Vec<f32>,

    fft_input: Vec<f32>,
    fft_output: Vec<f32>,
    spectrum_scratch: Vec<Complex32>,
    forward_scratch: Vec<Complex32>,
    inverse_scratch: Vec<Complex32>,

    frame: SpectralFrame,
    frames_analyzed: u64,
}

impl SpectralEngine {
    /// Plan the transforms and allocate all buffers
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if there are no channels, the shift
    /// is zero, or shift plus padding does not fit in the transform.
    pub fn new(config: StftConfig) -> Result<Self, DoaError> {
        config.validate()?;

        let frame_len = config.frame_len();
        let channels = config.channels;
        let fft_size = config.fft_size;
        let bins = config.num_bins();

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();

        let analysis_window = config
            .window
            .has_analysis()
            .then(|| Window::hann(frame_len));
        let synthesis_window = match (&analysis_window, config.window.has_synthesis()) {
            (Some(analysis), true) => Some(Window::complementary(analysis, config.shift)),
            _ => None,
        };

        log::debug!(
            "STFT engine: {} channels, shift={}, fft_size={}, padding={}+{}, window={:?}",
            channels,
            config.shift,
            fft_size,
            config.zero_pad_front,
            config.zero_pad_back,
            config.window
        );

        Ok(Self {
            frame_len,
            forward,
            inverse,
            analysis_window,
            synthesis_window,
            input_tail: vec![0.0; channels * (frame_len - config.shift)],
            output_tail: vec![0.0; channels * (fft_size - config.shift)],
            time_frame: vec![0.0; channels * fft_size],
            fft_input: vec![0.0; fft_size],
            fft_output: vec![0.0; fft_size],
            spectrum_scratch: vec![Complex32::new(0.0, 0.0); bins],
            forward_scratch,
            inverse_scratch,
            frame: SpectralFrame::zeros(channels, bins),
            frames_analyzed: 0,
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Number of blocks analyzed since construction or the last reset
    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Most recent spectral frame
    pub fn frame(&self) -> &SpectralFrame {
        &self.frame
    }

    /// Most recent spectral frame, for in-place processing before synthesis
    pub fn frame_mut(&mut self) -> &mut SpectralFrame {
        &mut self.frame
    }

    /// Unwindowed time-domain buffers of the most recent frame, channel-major
    ///
    /// Each channel occupies `fft_size` samples including the zero padding.
    pub fn time_frame(&self) -> &[f32] {
        &self.time_frame
    }

    /// Analyze one interleaved block of `channels × shift` samples
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if `block` has the wrong length.
    pub fn analyze(&mut self, block: &[f32]) -> Result<&SpectralFrame, DoaError> {
        let channels = self.config.channels;
        if block.len() != self.config.block_len() {
            return Err(DoaError::ContractViolation(format!(
                "Expected a block of {} samples ({} channels × {}), got {}",
                self.config.block_len(),
                channels,
                self.config.shift,
                block.len()
            )));
        }

        let fft_size = self.config.fft_size;
        let front = self.config.zero_pad_front;
        let shift = self.config.shift;
        let n = self.frame_len;
        let tail_len = n - shift;

        for ch in 0..channels {
            let td = &mut self.time_frame[ch * fft_size..(ch + 1) * fft_size];
            let tail = &mut self.input_tail[ch * tail_len..(ch + 1) * tail_len];

            // [tail][block] fills the data region; padding stays zero
            td[front..front + tail_len].copy_from_slice(tail);
            for (dst, &src) in td[front + tail_len..front + n]
                .iter_mut()
                .zip(block.iter().skip(ch).step_by(channels))
            {
                *dst = src;
            }
            tail.copy_from_slice(&td[front + shift..front + n]);

            self.fft_input.copy_from_slice(td);
            if let Some(window) = &self.analysis_window {
                window.apply(&mut self.fft_input[front..front + n]);
            }

            self.forward.process_with_scratch(
                &mut self.fft_input,
                self.frame.channel_mut(ch),
                &mut self.forward_scratch,
            )?;
        }

        self.frames_analyzed += 1;
        Ok(&self.frame)
    }

    /// Resynthesize one interleaved block of `channels × shift` samples
    ///
    /// Uses the current frame (as left by `analyze`, possibly modified through
    /// [`frame_mut`](Self::frame_mut)).
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if `out` has the wrong length or
    /// no block has been analyzed yet.
    pub fn synthesize(&mut self, out: &mut [f32]) -> Result<(), DoaError> {
        let channels = self.config.channels;
        if out.len() != self.config.block_len() {
            return Err(DoaError::ContractViolation(format!(
                "Expected an output block of {} samples, got {}",
                self.config.block_len(),
                out.len()
            )));
        }

        if self.frames_analyzed == 0 {
            return Err(DoaError::ContractViolation(
                "synthesize() called before any block was analyzed".to_string(),
            ));
        }

        let fft_size = self.config.fft_size;
        let front = self.config.zero_pad_front;
        let shift = self.config.shift;
        let n = self.frame_len;
        let tail_len = fft_size - shift;
        let scale = 1.0 / fft_size as f32;
        let last_bin = self.spectrum_scratch.len() - 1;

        for ch in 0..channels {
            self.spectrum_scratch.copy_from_slice(self.frame.channel(ch));
            // The inverse real transform needs real DC (and Nyquist for even sizes)
            self.spectrum_scratch[0].im = 0.0;
            if fft_size % 2 == 0 {
                self.spectrum_scratch[last_bin].im = 0.0;
            }

            self.inverse.process_with_scratch(
                &mut self.spectrum_scratch,
                &mut self.fft_output,
                &mut self.inverse_scratch,
            )?;

            if let Some(window) = &self.synthesis_window {
                window.apply(&mut self.fft_output[front..front + n]);
            }

            let y = &self.fft_output;
            let tail = &mut self.output_tail[ch * tail_len..(ch + 1) * tail_len];

            if shift <= tail_len {
                for i in 0..shift {
                    out[i * channels + ch] = (tail[i] + y[i]) * scale;
                }
                for i in 0..tail_len - shift {
                    tail[i] = tail[i + shift] + y[i + shift];
                }
                tail[tail_len - shift..].copy_from_slice(&y[tail_len..]);
            } else {
                // The block extends past the carried overlap: the exposed
                // region [tail_len, shift) has no overlap partner yet
                for i in 0..tail_len {
                    out[i * channels + ch] = (tail[i] + y[i]) * scale;
                }
                for i in tail_len..shift {
                    out[i * channels + ch] = y[i] * scale;
                }
                tail.copy_from_slice(&y[shift..]);
            }
        }

        Ok(())
    }

    /// Forget all stream state (tails, current frame, counters)
    pub fn reset(&mut self) {
        self.input_tail.fill(0.0);
        self.output_tail.fill(0.0);
        self.time_frame.fill(0.0);
        self.frame.clear();
        self.frames_analyzed = 0;
    }
}

impl std::fmt::Debug for SpectralEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEngine")
            .field("config", &self.config)
            .field("frames_analyzed", &self.frames_analyzed)
            .finish()
    }
}
