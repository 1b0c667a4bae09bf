//! Error module for the Rusty iEEG library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum IEEGError {
    /// Error for invalid parameters, e.g., a location matrix with the wrong number of rows.
    InvalidParameter(String),
    /// Error for a per-session sample rate list whose length differs from the number of sessions.
    SampleRateMismatch { expected: usize, got: usize },
    /// Error for incompatible shapes between data, locations and sessions.
    ShapeMismatch(String),
    /// Error for a template affine whose rotation/scale block cannot be inverted.
    SingularAffine,
    /// Error for a channel location that does not map to a finite voxel coordinate.
    InvalidLocation { channel: usize },
    /// Error for out of bounds access, e.g., a voxel outside the grid.
    OutOfBounds(String),
    /// Error for a volume grid whose size overflows.
    GridTooLarge(String),
    /// Error for an unknown file extension or example name.
    UnsupportedFormat(String),
    /// Error for a missing file.
    NotFound(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for IEEGError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IEEGError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            IEEGError::SampleRateMismatch { expected, got } => write!(
                f,
                "Should be one sample rate for each session: {} sessions but {} sample rates",
                expected, got
            ),
            IEEGError::ShapeMismatch(e) => write!(f, "Shape mismatch: {}", e),
            IEEGError::SingularAffine => {
                write!(f, "The rotation/scale block of the affine is not invertible")
            }
            IEEGError::InvalidLocation { channel } => {
                write!(f, "Channel {} has a non-finite voxel coordinate", channel)
            }
            IEEGError::OutOfBounds(e) => write!(f, "Index out of bounds: {}", e),
            IEEGError::GridTooLarge(e) => write!(f, "Volume grid too large: {}", e),
            IEEGError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            IEEGError::NotFound(e) => write!(f, "Not found: {}", e),
            IEEGError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for IEEGError {}
