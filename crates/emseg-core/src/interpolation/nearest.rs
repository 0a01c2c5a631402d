//! Nearest neighbor interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;

/// Nearest Neighbor Interpolator.
///
/// Picks the voxel at `floor(offset + 0.5)`, so exact halves go up.
/// Label maps go through this one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims(); // Z, Y, X
        let batch = indices.dims()[0];

        // indices: (x, y, z)
        let x = indices.clone().slice([0..batch, 0..1]).squeeze::<1>(1);
        let y = indices.clone().slice([0..batch, 1..2]).squeeze::<1>(1);
        let z = indices.slice([0..batch, 2..3]).squeeze::<1>(1);

        let x_i = x.add_scalar(0.5).floor().clamp(0.0, (d2 - 1) as f64).int();
        let y_i = y.add_scalar(0.5).floor().clamp(0.0, (d1 - 1) as f64).int();
        let z_i = z.add_scalar(0.5).floor().clamp(0.0, (d0 - 1) as f64).int();

        // Strides for [Z, Y, X]
        let stride_z = (d1 * d2) as i32;
        let stride_y = d2 as i32;

        let idx = z_i * stride_z + y_i * stride_y + x_i;
        let flat_data = data.clone().reshape([d0 * d1 * d2]);
        flat_data.gather(0, idx)
    }

    fn margin(&self) -> f64 {
        0.5
    }
}
