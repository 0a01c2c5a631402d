//! Volume filters: background estimation, reslicing and casting.

pub mod background;
pub mod cast;
pub mod resample;

pub use background::{estimate_background, guess_background_level, BackgroundGuess};
pub use cast::cast_volume;
pub use resample::{affine_sampling_matrix, reslice_affine, reslice_with_field, ResampleImageFilter};
