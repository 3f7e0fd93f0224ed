//! Error types for the localization pipeline

use std::fmt;

/// Errors that can occur while building or driving the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum DoaError {
    /// Invalid construction parameters or microphone geometry
    ///
    /// Raised only at construction time; an instance that was built
    /// successfully never reports this variant afterwards.
    Configuration(String),

    /// A caller broke a per-call precondition
    ///
    /// Wrong block length, reading a lookback age that is not (or no longer)
    /// stored, or calling `process()` without exactly one new frame.
    ContractViolation(String),

    /// The underlying FFT rejected its buffers
    Transform(String),
}

impl fmt::Display for DoaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoaError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            DoaError::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
            DoaError::Transform(msg) => write!(f, "Transform error: {}", msg),
        }
    }
}

impl std::error::Error for DoaError {}

impl From<realfft::FftError> for DoaError {
    fn from(err: realfft::FftError) -> Self {
        DoaError::Transform(err.to_string())
    }
}
