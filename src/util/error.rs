//! Error types for ultraface.

use thiserror::Error;

/// Result alias for ultraface operations.
pub type UltraFaceResult<T> = std::result::Result<T, UltraFaceError>;

/// Errors that can occur while generating priors, decoding or suppressing.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum UltraFaceError {
    /// Input image dimensions must both be non-zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// A raw tensor does not line up with the prior count.
    #[error("{what} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A threshold is NaN or outside its allowed range.
    #[error("invalid {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// Unknown suppression mode name or code.
    #[error("invalid nms mode: {0}")]
    InvalidNmsMode(String),
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The worker pool for parallel decode could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}
