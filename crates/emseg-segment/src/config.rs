//! Run-wide parameters and compiler options.

use std::path::PathBuf;

use emseg_core::InterpolationMode;
use serde::{Deserialize, Serialize};

/// Maximum deviation of a branch's child probabilities from 1.0 before a
/// warning is recorded.
pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Parameters of a segmentation run that are not stored in the class tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalParameters {
    /// Let the engine use several threads.
    pub enable_multithreading: bool,
    /// Interpolation used when the engine registers atlas to target.
    pub registration_interpolation: InterpolationMode,
    /// Directory the engine writes intermediate results to.
    pub print_dir: Option<PathBuf>,
    /// Number of subjects the atlas was trained on.
    pub atlas_training_samples: u32,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self {
            enable_multithreading: true,
            registration_interpolation: InterpolationMode::Linear,
            print_dir: None,
            atlas_training_samples: 0,
        }
    }
}

impl GlobalParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multithreading(mut self, enable: bool) -> Self {
        self.enable_multithreading = enable;
        self
    }

    pub fn with_registration_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.registration_interpolation = mode;
        self
    }

    pub fn with_print_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.print_dir = Some(dir.into());
        self
    }

    pub fn with_atlas_training_samples(mut self, samples: u32) -> Self {
        self.atlas_training_samples = samples;
        self
    }
}

/// Options controlling [`compile`](crate::compiler::compile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Allowed `|sum - 1|` of the child probabilities of a branch.
    pub probability_tolerance: f64,
    /// Resize channel weights, means and covariances to the channel count
    /// before compiling.
    pub resize_channels: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            resize_channels: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    /// Compile the tree's vectors as they are.
    pub fn without_channel_resize(mut self) -> Self {
        self.resize_channels = false;
        self
    }
}
