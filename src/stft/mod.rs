//! Streaming short-time Fourier transform
//!
//! - [`SpectralEngine`]: block-in, frame-out analysis with overlap-add synthesis
//! - [`SpectralHistory`]: the same engine plus a bounded look-back of past frames
//! - [`HistoryRing`]: the age-addressed ring buffer underneath

pub mod engine;
pub mod frame;
pub mod history;

pub use engine::{SpectralEngine, StftConfig};
pub use frame::SpectralFrame;
pub use history::{HistoryRing, SpectralHistory};
