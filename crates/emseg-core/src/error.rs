//! Error types for volume preparation.
//!
//! Low-level components (estimator, resampler, caster) return these to their
//! caller; deciding whether the larger pipeline aborts is left to the caller.

use thiserror::Error;

use crate::image::ScalarType;

/// Main error type for volume operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A volume or its voxel buffer is absent.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Error in transform construction or inversion.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// The requested interpolation mode has no implementation.
    #[error("Unsupported interpolation: {0}")]
    UnsupportedInterpolation(String),

    /// Voxel count does not match the grid dimensions.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Two buffers were expected to share a scalar type.
    #[error("Scalar type mismatch: expected {expected}, got {actual}")]
    ScalarTypeMismatch {
        expected: ScalarType,
        actual: ScalarType,
    },

    /// Tensor data could not be read back from the backend.
    #[error("Tensor data error: {0}")]
    TensorData(String),
}

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a missing data error.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Create an unsupported interpolation error.
    pub fn unsupported_interpolation(msg: impl Into<String>) -> Self {
        Self::UnsupportedInterpolation(msg.into())
    }

    /// Create a tensor data error.
    pub fn tensor_data(msg: impl Into<String>) -> Self {
        Self::TensorData(msg.into())
    }
}
