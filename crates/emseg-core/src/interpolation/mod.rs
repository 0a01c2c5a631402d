//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates.

pub mod linear;
pub mod nearest;
pub mod trait_;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use trait_::Interpolator;

/// Interpolation requested for a reslice.
///
/// `Cubic` is accepted in configurations but has no sampler; resampling
/// with it is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolationMode {
    NearestNeighbor,
    #[default]
    Linear,
    Cubic,
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpolationMode::NearestNeighbor => "nearest neighbor",
            InterpolationMode::Linear => "linear",
            InterpolationMode::Cubic => "cubic",
        };
        f.write_str(name)
    }
}
