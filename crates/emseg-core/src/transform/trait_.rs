//! Transform trait for point mappings evaluated on tensors.
//!
//! The resampler pushes every output sample through one of these to find
//! where it lands in the input buffer.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Point mapping applied to a batch of points.
///
/// Transforms here are plain values, not trainable modules: they are built
/// once from host-side matrices and displacement grids and then evaluated.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality
pub trait Transform<B: Backend, const D: usize> {
    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, D]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, D]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}
