//! Trilinear interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;

/// Offsets this far past the last voxel still sample the border voxel.
const EDGE_TOLERANCE: f64 = 1e-3;

/// Linear Interpolator.
///
/// Performs trilinear interpolation over the eight surrounding voxels.
/// At integer offsets every weight is zero or one, so the voxel value is
/// returned unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn gather_3d<B: Backend>(
        flat_data: &Tensor<B, 1>,
        xi: &Tensor<B, 1, Int>,
        yi: &Tensor<B, 1, Int>,
        zi: &Tensor<B, 1, Int>,
        stride_y: i32,
        stride_z: i32,
    ) -> Tensor<B, 1> {
        let idx = zi.clone() * stride_z + yi.clone() * stride_y + xi.clone();
        flat_data.clone().gather(0, idx)
    }

    /// `a (1 - w) + b w`, taking `a` as is where `w` is exactly zero so a
    /// non-finite `b` cannot leak in through a zero weight.
    #[inline]
    fn lerp<B: Backend>(
        a: Tensor<B, 1>,
        b: Tensor<B, 1>,
        w: &Tensor<B, 1>,
        at_a: &Tensor<B, 1, Bool>,
    ) -> Tensor<B, 1> {
        let one_minus_w = w.clone().neg().add_scalar(1.0);
        (a.clone() * one_minus_w + b * w.clone()).mask_where(at_a.clone(), a)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims(); // Z, Y, X

        // indices: [Batch, 3] -> (x, y, z)
        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let z = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let z0 = z.clone().floor();

        let wx = x - x0.clone();
        let wy = y - y0.clone();
        let wz = z - z0.clone();

        let x1 = x0.clone() + 1.0;
        let y1 = y0.clone() + 1.0;
        let z1 = z0.clone() + 1.0;

        let x0_i = x0.clamp(0.0, (d2 - 1) as f64).int();
        let y0_i = y0.clamp(0.0, (d1 - 1) as f64).int();
        let z0_i = z0.clamp(0.0, (d0 - 1) as f64).int();

        let x1_i = x1.clamp(0.0, (d2 - 1) as f64).int();
        let y1_i = y1.clamp(0.0, (d1 - 1) as f64).int();
        let z1_i = z1.clamp(0.0, (d0 - 1) as f64).int();

        // Strides for [Z, Y, X]
        let stride_z = (d1 * d2) as i32;
        let stride_y = d2 as i32;

        let flat_data = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather_3d(&flat_data, &x0_i, &y0_i, &z0_i, stride_y, stride_z);
        let v001 = Self::gather_3d(&flat_data, &x0_i, &y0_i, &z1_i, stride_y, stride_z);
        let v010 = Self::gather_3d(&flat_data, &x0_i, &y1_i, &z0_i, stride_y, stride_z);
        let v011 = Self::gather_3d(&flat_data, &x0_i, &y1_i, &z1_i, stride_y, stride_z);
        let v100 = Self::gather_3d(&flat_data, &x1_i, &y0_i, &z0_i, stride_y, stride_z);
        let v101 = Self::gather_3d(&flat_data, &x1_i, &y0_i, &z1_i, stride_y, stride_z);
        let v110 = Self::gather_3d(&flat_data, &x1_i, &y1_i, &z0_i, stride_y, stride_z);
        let v111 = Self::gather_3d(&flat_data, &x1_i, &y1_i, &z1_i, stride_y, stride_z);

        let on_x = wx.clone().equal_elem(0.0);
        let on_y = wy.clone().equal_elem(0.0);
        let on_z = wz.clone().equal_elem(0.0);

        // Along X
        let c00 = Self::lerp(v000, v100, &wx, &on_x);
        let c01 = Self::lerp(v001, v101, &wx, &on_x);
        let c10 = Self::lerp(v010, v110, &wx, &on_x);
        let c11 = Self::lerp(v011, v111, &wx, &on_x);

        // Along Y
        let c0 = Self::lerp(c00, c10, &wy, &on_y);
        let c1 = Self::lerp(c01, c11, &wy, &on_y);

        // Along Z
        Self::lerp(c0, c1, &wz, &on_z)
    }

    fn margin(&self) -> f64 {
        EDGE_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn cube(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        // value = x + 10 y + 100 z on a 2x2x2 grid
        Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 1.0], [10.0, 11.0]], [[100.0, 101.0], [110.0, 111.0]]],
            device,
        )
    }

    #[test]
    fn test_linear_interpolator_exact_at_voxels() {
        let device = Default::default();
        let data = cube(&device);
        let interpolator = LinearInterpolator::new();

        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
            &device,
        );
        let values = interpolator.interpolate(&data, indices).into_data();
        assert_eq!(values.as_slice::<f32>().unwrap(), &[111.0, 10.0]);
    }

    #[test]
    fn test_linear_interpolator_midpoint() {
        let device = Default::default();
        let data = cube(&device);
        let interpolator = LinearInterpolator::new();

        let indices = Tensor::<TestBackend, 2>::from_floats([[0.5, 0.5, 0.5]], &device);
        let values = interpolator.interpolate(&data, indices).into_data();
        let v = values.as_slice::<f32>().unwrap()[0];
        // mean of all eight corners
        assert!((v - 55.5).abs() < 1e-4);
    }

    #[test]
    fn test_linear_interpolator_ignores_zero_weight_neighbours() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::from_floats([[[1.0, f32::NAN, 3.0]]], &device);
        let interpolator = LinearInterpolator::new();

        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.5, 0.0, 0.0]],
            &device,
        );
        let values = interpolator.interpolate(&data, indices).into_data();
        let v = values.as_slice::<f32>().unwrap();
        assert_eq!(v[0], 1.0);
        assert!(v[1].is_nan());
        assert_eq!(v[2], 3.0);
        assert!(v[3].is_nan());
    }

    #[test]
    fn test_linear_interpolator_clamps_at_border() {
        let device = Default::default();
        let data = cube(&device);
        let interpolator = LinearInterpolator::new();

        let indices = Tensor::<TestBackend, 2>::from_floats([[1.0005, 0.0, 0.0]], &device);
        let values = interpolator.interpolate(&data, indices).into_data();
        let v = values.as_slice::<f32>().unwrap()[0];
        assert!((v - 1.0).abs() < 1e-3);
    }
}
