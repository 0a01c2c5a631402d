//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator trait for sampling a volume at continuous buffer offsets.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous offsets.
    ///
    /// # Arguments
    /// * `data` - The source volume `[Z, Y, X]`
    /// * `indices` - Continuous offsets `[Batch, 3]`, rows `(x, y, z)`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;

    /// How far outside `[0, n - 1]` an offset may fall and still count as
    /// a sample of the volume rather than background.
    fn margin(&self) -> f64;
}
