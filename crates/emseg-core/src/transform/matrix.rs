//! Homogeneous 4x4 matrix transform.
//!
//! The affine reslice folds every matrix on the way from an output buffer
//! offset to an input buffer offset into one of these.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use super::trait_::Transform;
use crate::spatial::Matrix4;

/// Entries this close to an integer are stored as that integer.
pub const INTEGER_SNAP_TOLERANCE: f64 = 1e-10;

/// Affine map `y = A x + t` taken from the upper 3x4 block of a matrix.
#[derive(Debug, Clone)]
pub struct MatrixTransform<B: Backend> {
    matrix: Tensor<B, 2>,      // [3, 3]
    translation: Tensor<B, 1>, // [3]
}

impl<B: Backend> MatrixTransform<B> {
    /// Upload a host matrix.
    ///
    /// Near-integer entries are snapped first so that permutation and
    /// integer-shift matrices sample exactly on voxel centres after the
    /// narrowing to `f32`.
    pub fn from_matrix(matrix: &Matrix4, device: &B::Device) -> Self {
        let snapped = snap_to_integers(matrix);

        let mut linear = Vec::with_capacity(9);
        for r in 0..3 {
            for c in 0..3 {
                linear.push(snapped[(r, c)] as f32);
            }
        }
        let translation: Vec<f32> = (0..3).map(|r| snapped[(r, 3)] as f32).collect();

        Self {
            matrix: Tensor::<B, 1>::from_data(TensorData::new(linear, Shape::new([9])), device)
                .reshape([3, 3]),
            translation: Tensor::<B, 1>::from_data(
                TensorData::new(translation, Shape::new([3])),
                device,
            ),
        }
    }
}

impl<B: Backend> Transform<B, 3> for MatrixTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row vectors: y = x A^T + t
        let t = self.translation.clone().reshape([1, 3]);
        points.matmul(self.matrix.clone().transpose()) + t
    }
}

/// Round every entry within [`INTEGER_SNAP_TOLERANCE`] of an integer.
pub fn snap_to_integers(matrix: &Matrix4) -> Matrix4 {
    matrix.map(|v| {
        let r = v.round();
        if (v - r).abs() < INTEGER_SNAP_TOLERANCE {
            r
        } else {
            v
        }
    })
}

/// Whether a matrix only holds integer entries (after snapping).
pub fn is_integer_matrix(matrix: &Matrix4) -> bool {
    snap_to_integers(matrix).iter().all(|v| v.fract() == 0.0)
}
