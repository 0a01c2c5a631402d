//! Dense displacement field transform.
//!
//! A [`DisplacementField`] stores one displacement vector per point of a
//! regular grid and maps `p -> p + d(p)`, interpolating `d` trilinearly
//! between grid points. The deformable reslice composes the user's field
//! with the output index-to-physical map and the input physical-to-index
//! map into a single field over the output grid
//! ([`compose_displacement_field`]), then evaluates it on tensors through
//! [`GridDisplacement`].

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use rayon::prelude::*;

use super::trait_::Transform;
use crate::error::{CoreError, Result};
use crate::image::VolumeGeometry;
use crate::spatial::{multiply_point, Matrix4, Point3, Vector3};

/// Displacement vectors sampled on the grid coordinates of `grid`.
///
/// Only the extent, spacing and origin of `grid` are used; its
/// index-to-physical matrix is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementField {
    grid: VolumeGeometry,
    vectors: Vec<Vector3>,
    to_offset: Matrix4,
}

impl DisplacementField {
    /// Create a field; `vectors` are in buffer order, x fastest.
    pub fn new(grid: VolumeGeometry, vectors: Vec<Vector3>) -> Result<Self> {
        if vectors.len() != grid.num_voxels() {
            return Err(CoreError::ShapeMismatch {
                expected: grid.dimensions().to_vec(),
                actual: vec![vectors.len()],
            });
        }
        let to_offset = grid.grid_to_offset()?;
        Ok(Self {
            grid,
            vectors,
            to_offset,
        })
    }

    /// Field that leaves every point in place.
    pub fn zeros(grid: VolumeGeometry) -> Result<Self> {
        let n = grid.num_voxels();
        Self::new(grid, vec![Vector3::zeros(); n])
    }

    pub fn grid(&self) -> &VolumeGeometry {
        &self.grid
    }

    pub fn vectors(&self) -> &[Vector3] {
        &self.vectors
    }

    /// Displacement at a point, trilinear between grid points and clamped to
    /// the border value outside the grid.
    pub fn displacement(&self, point: &Point3) -> Vector3 {
        let dims = self.grid.dimensions();
        if self.vectors.is_empty() {
            return Vector3::zeros();
        }
        let c = multiply_point(&self.to_offset, point);

        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut w = [0.0f64; 3];
        for axis in 0..3 {
            let max = (dims[axis] - 1) as f64;
            let v = c[axis].clamp(0.0, max);
            let f = v.floor();
            lo[axis] = f as usize;
            hi[axis] = (lo[axis] + 1).min(dims[axis] - 1);
            w[axis] = v - f;
        }

        let at = |x: usize, y: usize, z: usize| self.vectors[x + dims[0] * (y + dims[1] * z)];
        let lerp = |a: Vector3, b: Vector3, t: f64| a * (1.0 - t) + b * t;

        let c00 = lerp(at(lo[0], lo[1], lo[2]), at(hi[0], lo[1], lo[2]), w[0]);
        let c10 = lerp(at(lo[0], hi[1], lo[2]), at(hi[0], hi[1], lo[2]), w[0]);
        let c01 = lerp(at(lo[0], lo[1], hi[2]), at(hi[0], lo[1], hi[2]), w[0]);
        let c11 = lerp(at(lo[0], hi[1], hi[2]), at(hi[0], hi[1], hi[2]), w[0]);

        let c0 = lerp(c00, c10, w[1]);
        let c1 = lerp(c01, c11, w[1]);
        lerp(c0, c1, w[2])
    }

    /// `p + d(p)`.
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        point + self.displacement(point)
    }
}

/// Fold `post(field(pre(p)))` into a displacement field over `grid`.
///
/// For every grid point `p` of `grid` (grid coordinates, x fastest) the
/// stored vector is `post(field(pre(p))) - p`. The result carries `grid`'s
/// extent, spacing and origin with an identity index-to-physical matrix.
pub fn compose_displacement_field(
    field: &DisplacementField,
    pre: &Matrix4,
    post: &Matrix4,
    grid: &VolumeGeometry,
) -> Result<DisplacementField> {
    let [nx, ny, nz] = grid.dimensions();
    let total = nx * ny * nz;

    let vectors: Vec<Vector3> = (0..total)
        .into_par_iter()
        .map(|offset| {
            let x = offset % nx;
            let y = (offset / nx) % ny;
            let z = offset / (nx * ny);
            let p = grid.grid_point([x, y, z]);
            let q = multiply_point(post, &field.transform_point(&multiply_point(pre, &p)));
            q - p
        })
        .collect();

    tracing::debug!(points = total, "composed displacement field");

    let composed = VolumeGeometry::new(grid.extent, grid.spacing, grid.origin, Matrix4::identity());
    DisplacementField::new(composed, vectors)
}

/// Per-row displacement for points sampled exactly at a field's grid points.
///
/// Row `n` of the input must be grid point `n` of the field it was built
/// from; the resampler guarantees this by generating its sample grid from
/// the same geometry.
#[derive(Debug, Clone)]
pub struct GridDisplacement<B: Backend> {
    displacement: Tensor<B, 2>, // [N, 3]
}

impl<B: Backend> GridDisplacement<B> {
    pub fn from_field(field: &DisplacementField, device: &B::Device) -> Self {
        let n = field.vectors.len();
        let flat: Vec<f32> = field
            .vectors
            .iter()
            .flat_map(|v| [v[0] as f32, v[1] as f32, v[2] as f32])
            .collect();
        let displacement =
            Tensor::<B, 1>::from_data(TensorData::new(flat, Shape::new([n * 3])), device)
                .reshape([n, 3]);
        Self { displacement }
    }

    /// Number of grid points covered.
    pub fn len(&self) -> usize {
        self.displacement.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B: Backend> Transform<B, 3> for GridDisplacement<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points + self.displacement.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Spacing3;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn ramp_field() -> DisplacementField {
        // d(x, y, z) = (x, 0, 0) on a 3x2x2 grid with spacing 2
        let grid = VolumeGeometry::new(
            [0, 2, 0, 1, 0, 1],
            Spacing3::new(2.0, 2.0, 2.0),
            Point3::origin(),
            Matrix4::identity(),
        );
        let mut vectors = Vec::new();
        for _z in 0..2 {
            for _y in 0..2 {
                for x in 0..3 {
                    vectors.push(Vector3::new(x as f64, 0.0, 0.0));
                }
            }
        }
        DisplacementField::new(grid, vectors).unwrap()
    }

    #[test]
    fn test_field_interpolates_between_grid_points() {
        let field = ramp_field();
        // grid coordinate 3.0 is halfway between x offsets 1 and 2
        let d = field.displacement(&Point3::new(3.0, 1.0, 1.0));
        assert!((d[0] - 1.5).abs() < 1e-12);
        assert_eq!(d[1], 0.0);

        let moved = field.transform_point(&Point3::new(2.0, 0.0, 0.0));
        assert!((moved - Point3::new(3.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_field_clamps_outside_grid() {
        let field = ramp_field();
        let d = field.displacement(&Point3::new(100.0, -5.0, 0.0));
        assert!((d[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_field_rejects_wrong_length() {
        let grid = VolumeGeometry::from_dimensions([2, 2, 2]);
        let err = DisplacementField::new(grid, vec![Vector3::zeros(); 3]).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_compose_with_shift_and_zero_field() {
        let grid = VolumeGeometry::from_dimensions([4, 3, 2]);
        let field = DisplacementField::zeros(grid.clone()).unwrap();
        let mut post = Matrix4::identity();
        post[(1, 3)] = -1.5;

        let composed = compose_displacement_field(&field, &Matrix4::identity(), &post, &grid).unwrap();
        assert_eq!(composed.vectors().len(), 24);
        for v in composed.vectors() {
            assert_eq!(*v, Vector3::new(0.0, -1.5, 0.0));
        }
    }

    #[test]
    fn test_compose_identity_is_zero_displacement() {
        let grid = VolumeGeometry::from_dimensions([3, 3, 3]);
        let field = DisplacementField::zeros(grid.clone()).unwrap();
        let composed =
            compose_displacement_field(&field, &Matrix4::identity(), &Matrix4::identity(), &grid)
                .unwrap();
        assert!(composed.vectors().iter().all(|v| *v == Vector3::zeros()));
    }

    #[test]
    fn test_grid_displacement_adds_rows() {
        let device = Default::default();
        let field = ramp_field();
        let transform = GridDisplacement::<TestBackend>::from_field(&field, &device);
        assert_eq!(transform.len(), 12);

        let points = Tensor::<TestBackend, 2>::zeros([12, 3], &device);
        let data = transform.transform_points(points).into_data();
        let slice = data.as_slice::<f32>().unwrap();
        // row 2 is x offset 2
        assert_eq!(&slice[6..9], &[2.0, 0.0, 0.0]);
    }
}
