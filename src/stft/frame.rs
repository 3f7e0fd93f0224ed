//! Multichannel frequency-domain frame

use rustfft::num_complex::Complex32;

/// Complex spectrum of every channel for one transform
///
/// Storage is channel-major: the `bins` values of channel 0, then channel 1,
/// and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    channels: usize,
    bins: usize,
    data: Vec<Complex32>,
}

impl SpectralFrame {
    /// All-zero frame
    pub fn zeros(channels: usize, bins: usize) -> Self {
        Self {
            channels,
            bins,
            data: vec![Complex32::new(0.0, 0.0); channels * bins],
        }
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frequency bins per channel
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Value at `(bin, channel)`
    ///
    /// # Panics
    ///
    /// Panics if `bin` or `channel` is out of range.
    #[inline]
    pub fn get(&self, bin: usize, channel: usize) -> Complex32 {
        assert!(bin < self.bins, "bin {} out of range ({} bins)", bin, self.bins);
        self.data[channel * self.bins + bin]
    }

    /// Spectrum of one channel
    #[inline]
    pub fn channel(&self, channel: usize) -> &[Complex32] {
        &self.data[channel * self.bins..(channel + 1) * self.bins]
    }

    /// Mutable spectrum of one channel
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [Complex32] {
        &mut self.data[channel * self.bins..(channel + 1) * self.bins]
    }

    /// Overwrite this frame with `other` without reallocating
    ///
    /// # Panics
    ///
    /// Panics if the two frames have different dimensions.
    pub fn copy_from(&mut self, other: &SpectralFrame) {
        assert_eq!(
            (self.channels, self.bins),
            (other.channels, other.bins),
            "frame dimensions differ"
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Set every value to zero
    pub fn clear(&mut self) {
        self.data.fill(Complex32::new(0.0, 0.0));
    }
}
