//! Bounded look-back over past transforms
//!
//! [`HistoryRing`] is a fixed-capacity ring addressed by age (0 = newest).
//! [`SpectralHistory`] wraps a [`SpectralEngine`] and records every frame it
//! produces, so consumers can read a frame computed several blocks ago
//! without recomputing it.

use super::engine::{SpectralEngine, StftConfig};
use super::frame::SpectralFrame;
use crate::error::DoaError;
use crate::window::WindowMode;
use rustfft::num_complex::Complex32;

/// Fixed-capacity ring buffer addressed by age
///
/// Slots are preallocated from a template and overwritten in place; pushing
/// never allocates.
#[derive(Debug, Clone)]
pub struct HistoryRing<T> {
    slots: Vec<T>,
    /// Slot holding the newest entry
    head: usize,
    len: usize,
    total_pushed: u64,
}

impl<T: Clone> HistoryRing<T> {
    /// Ring of `capacity` slots, each initialized from `template`
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if `capacity` is zero.
    pub fn new(capacity: usize, template: T) -> Result<Self, DoaError> {
        if capacity == 0 {
            return Err(DoaError::Configuration(
                "History capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            slots: vec![template; capacity],
            head: capacity - 1,
            len: 0,
            total_pushed: 0,
        })
    }
}

impl<T> HistoryRing<T> {
    /// Overwrite the oldest slot in place and make it the newest entry
    pub fn push_with<F: FnOnce(&mut T)>(&mut self, fill: F) {
        self.head = (self.head + 1) % self.slots.len();
        fill(&mut self.slots[self.head]);
        self.len = (self.len + 1).min(self.slots.len());
        self.total_pushed += 1;
    }

    /// Store `value` as the newest entry, evicting the oldest when full
    pub fn push(&mut self, value: T) {
        self.push_with(|slot| *slot = value);
    }

    /// Entry pushed `age` pushes ago (0 = newest)
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` if fewer than `age + 1` entries
    /// are held.
    pub fn get(&self, age: usize) -> Result<&T, DoaError> {
        if age >= self.len {
            return Err(DoaError::ContractViolation(format!(
                "History age {} not available ({} of {} slots filled)",
                age,
                self.len,
                self.slots.len()
            )));
        }
        let capacity = self.slots.len();
        Ok(&self.slots[(self.head + capacity - age) % capacity])
    }

    /// Maximum number of entries held
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// True until the first push
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pushes since construction or the last clear
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Forget all entries; slot storage is kept
    pub fn clear(&mut self) {
        self.head = self.slots.len() - 1;
        self.len = 0;
        self.total_pushed = 0;
    }
}

/// Spectral engine that remembers its last `capacity` frames
///
/// Each [`transform`](Self::transform) runs the wrapped engine once and
/// records both the spectral frame and the unwindowed time-domain buffer.
/// Age 0 is always the frame of the most recent block.
#[derive(Debug)]
pub struct SpectralHistory {
    engine: SpectralEngine,
    frames: HistoryRing<SpectralFrame>,
    time_frames: HistoryRing<Vec<f32>>,
}

impl SpectralHistory {
    /// Wrap `engine`, keeping the last `capacity` frames
    ///
    /// # Errors
    ///
    /// Returns `DoaError::Configuration` if `capacity` is zero.
    pub fn new(engine: SpectralEngine, capacity: usize) -> Result<Self, DoaError> {
        let config = engine.config();
        let frames = HistoryRing::new(
            capacity,
            SpectralFrame::zeros(config.channels, config.num_bins()),
        )?;
        let time_frames = HistoryRing::new(capacity, vec![0.0f32; config.channels * config.fft_size])?;

        log::debug!(
            "Spectral history: {} frames of {} channels × {} bins",
            capacity,
            config.channels,
            config.num_bins()
        );

        Ok(Self {
            engine,
            frames,
            time_frames,
        })
    }

    /// Non-overlapping analysis history: each block of `fft_size` samples is
    /// transformed on its own
    pub fn lookback(
        fft_size: usize,
        channels: usize,
        capacity: usize,
        window: WindowMode,
    ) -> Result<Self, DoaError> {
        let engine = SpectralEngine::new(StftConfig::new(fft_size, fft_size, channels).with_window(window))?;
        Self::new(engine, capacity)
    }

    /// Analyze one interleaved block and record the resulting frame
    ///
    /// # Errors
    ///
    /// Propagates block-length errors from [`SpectralEngine::analyze`].
    pub fn transform(&mut self, block: &[f32]) -> Result<&SpectralFrame, DoaError> {
        let frame = self.engine.analyze(block)?;
        self.frames.push_with(|slot| slot.copy_from(frame));
        let time_frame = self.engine.time_frame();
        self.time_frames
            .push_with(|slot| slot.copy_from_slice(time_frame));
        Ok(self.engine.frame())
    }

    /// Spectral value at `bin` of `channel`, `age` transforms ago
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` for an age not yet available or
    /// an out-of-range bin or channel.
    pub fn get_fd_sample(&self, age: usize, bin: usize, channel: usize) -> Result<Complex32, DoaError> {
        let frame = self.frames.get(age)?;
        if bin >= frame.bins() || channel >= frame.channels() {
            return Err(DoaError::ContractViolation(format!(
                "Spectral sample (bin {}, channel {}) out of range ({} bins, {} channels)",
                bin,
                channel,
                frame.bins(),
                frame.channels()
            )));
        }
        Ok(frame.get(bin, channel))
    }

    /// Unwindowed time-domain sample `n` of `channel`, `age` transforms ago
    ///
    /// `n` indexes the full transform buffer, zero padding included.
    ///
    /// # Errors
    ///
    /// Returns `DoaError::ContractViolation` for an age not yet available or
    /// an out-of-range sample or channel.
    pub fn get_td_sample(&self, age: usize, n: usize, channel: usize) -> Result<f32, DoaError> {
        let td = self.time_frames.get(age)?;
        let fft_size = self.fft_size();
        if n >= fft_size || channel >= self.channels() {
            return Err(DoaError::ContractViolation(format!(
                "Time sample (n {}, channel {}) out of range ({} samples, {} channels)",
                n,
                channel,
                fft_size,
                self.channels()
            )));
        }
        Ok(td[channel * fft_size + n])
    }

    /// Whole spectral frame from `age` transforms ago
    pub fn frame(&self, age: usize) -> Result<&SpectralFrame, DoaError> {
        self.frames.get(age)
    }

    /// Current frame of the wrapped engine, for in-place processing before
    /// [`synthesize`](Self::synthesize)
    ///
    /// Changes do not affect the recorded history.
    pub fn frame_mut(&mut self) -> &mut SpectralFrame {
        self.engine.frame_mut()
    }

    /// Resynthesize the current frame through the wrapped engine
    pub fn synthesize(&mut self, out: &mut [f32]) -> Result<(), DoaError> {
        self.engine.synthesize(out)
    }

    /// Transforms performed since construction or the last reset
    pub fn frames_transformed(&self) -> u64 {
        self.frames.total_pushed()
    }

    /// Number of frames retained
    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    /// Frames currently available for look-back
    pub fn available(&self) -> usize {
        self.frames.len()
    }

    /// Transform size of the wrapped engine
    pub fn fft_size(&self) -> usize {
        self.engine.config().fft_size
    }

    /// Channels per block
    pub fn channels(&self) -> usize {
        self.engine.config().channels
    }

    /// Bins per channel in each frame
    pub fn num_bins(&self) -> usize {
        self.engine.config().num_bins()
    }

    /// The wrapped engine
    pub fn engine(&self) -> &SpectralEngine {
        &self.engine
    }

    /// Forget all frames and the engine's stream state
    pub fn reset(&mut self) {
        self.engine.reset();
        self.frames.clear();
        self.time_frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraparound() {
        let mut ring = HistoryRing::new(3, 0u32).unwrap();
        assert!(ring.is_empty());
        assert!(ring.get(0).is_err());

        for v in 1..=5 {
            ring.push(v);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.total_pushed(), 5);
        assert_eq!(*ring.get(0).unwrap(), 5);
        assert_eq!(*ring.get(1).unwrap(), 4);
        assert_eq!(*ring.get(2).unwrap(), 3);
        assert!(matches!(ring.get(3), Err(DoaError::ContractViolation(_))));
    }

    #[test]
    fn test_ring_partial_fill() {
        let mut ring = HistoryRing::new(4, 0i32).unwrap();
        ring.push(10);
        ring.push(20);
        assert_eq!(*ring.get(1).unwrap(), 10);
        assert!(ring.get(2).is_err());

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.total_pushed(), 0);
    }

    #[test]
    fn test_ring_zero_capacity() {
        assert!(HistoryRing::new(0, 0u8).is_err());
    }

    #[test]
    fn test_lookback_returns_past_frames() {
        let mut history = SpectralHistory::lookback(8, 2, 3, WindowMode::None).unwrap();

        // Block b is constant b on channel 0 and -b on channel 1
        for b in 1..=4 {
            let block: Vec<f32> = (0..16)
                .map(|i| if i % 2 == 0 { b as f32 } else { -(b as f32) })
                .collect();
            history.transform(&block).unwrap();
        }

        assert_eq!(history.frames_transformed(), 4);
        assert_eq!(history.available(), 3);
        for age in 0..3 {
            let b = (4 - age) as f32;
            let dc0 = history.get_fd_sample(age, 0, 0).unwrap();
            let dc1 = history.get_fd_sample(age, 0, 1).unwrap();
            assert!((dc0.re - 8.0 * b).abs() < 1e-4, "age {}: {}", age, dc0);
            assert!((dc1.re + 8.0 * b).abs() < 1e-4, "age {}: {}", age, dc1);
            assert_eq!(history.get_td_sample(age, 3, 0).unwrap(), b);
        }
        assert!(history.get_fd_sample(3, 0, 0).is_err());
    }

    #[test]
    fn test_lookback_partial_fill_matches_blocks() {
        let (fft_size, channels, capacity, pushed) = (8, 3, 5, 3);
        let mut history =
            SpectralHistory::lookback(fft_size, channels, capacity, WindowMode::None).unwrap();

        // Every (block, sample, channel) gets its own value
        let blocks: Vec<Vec<f32>> = (0..pushed)
            .map(|b| {
                (0..fft_size * channels)
                    .map(|i| (b * 100 + (i / channels) * 3 + i % channels) as f32)
                    .collect()
            })
            .collect();
        for block in &blocks {
            history.transform(block).unwrap();
        }

        assert_eq!(history.available(), pushed);
        assert_eq!(history.frames_transformed(), pushed as u64);
        for age in 0..pushed {
            let block = &blocks[pushed - 1 - age];
            for n in 0..fft_size {
                for ch in 0..channels {
                    assert_eq!(
                        history.get_td_sample(age, n, ch).unwrap(),
                        block[n * channels + ch],
                        "age {}, sample {}, channel {}",
                        age,
                        n,
                        ch
                    );
                }
            }
        }

        assert!(matches!(
            history.get_td_sample(pushed, 0, 0),
            Err(DoaError::ContractViolation(_))
        ));
        assert!(matches!(
            history.get_fd_sample(pushed, 0, 0),
            Err(DoaError::ContractViolation(_))
        ));
        assert!(matches!(history.frame(pushed), Err(DoaError::ContractViolation(_))));
    }

    #[test]
    fn test_every_engine_frame_is_recorded() {
        let mut history = SpectralHistory::lookback(16, 2, 4, WindowMode::Analysis).unwrap();
        for b in 0..6 {
            let block: Vec<f32> = (0..32).map(|i| ((b * 32 + i) as f32 * 0.1).cos()).collect();
            history.transform(&block).unwrap();
            assert_eq!(history.engine().frames_analyzed(), history.frames_transformed());
            assert_eq!(history.frame(0).unwrap(), history.engine().frame());
        }
    }

    #[test]
    fn test_out_of_range_samples() {
        let mut history = SpectralHistory::lookback(16, 2, 2, WindowMode::None).unwrap();
        history.transform(&[0.0; 32]).unwrap();
        assert!(history.get_fd_sample(0, 9, 0).is_err());
        assert!(history.get_fd_sample(0, 8, 2).is_err());
        assert!(history.get_td_sample(0, 16, 0).is_err());
        assert!(history.get_fd_sample(0, 8, 1).is_ok());
    }

    #[test]
    fn test_history_matches_engine_frame() {
        let mut history = SpectralHistory::lookback(32, 1, 2, WindowMode::Analysis).unwrap();
        let block: Vec<f32> = (0..32).map(|i| (i as f32 * 0.3).sin()).collect();
        let current = history.transform(&block).unwrap().clone();
        assert_eq!(history.frame(0).unwrap(), &current);
        assert_eq!(history.frame(0).unwrap(), history.engine().frame());
    }

    #[test]
    fn test_overlapping_history_and_synthesis() {
        let engine = SpectralEngine::new(
            StftConfig::new(16, 64, 1).with_window(WindowMode::AnalysisSynthesis),
        )
        .unwrap();
        let mut history = SpectralHistory::new(engine, 4).unwrap();
        let mut out = vec![0.0f32; 16];
        let mut energy = 0.0;
        for b in 0..12 {
            let block: Vec<f32> = (0..16).map(|i| ((b * 16 + i) as f32 * 0.2).sin()).collect();
            history.transform(&block).unwrap();
            history.synthesize(&mut out).unwrap();
            energy += out.iter().map(|x| x * x).sum::<f32>();
        }
        assert!(energy > 1.0);
        assert_eq!(history.available(), 4);

        history.reset();
        assert_eq!(history.frames_transformed(), 0);
        assert!(history.frame(0).is_err());
    }
}
