//! Spatial types for points, vectors and homogeneous matrices.
//!
//! All types are nalgebra aliases in `f64`; tensors only ever see `f32`
//! copies built at the resampling boundary.

use nalgebra::{Matrix4 as NaMatrix4, Point3 as NaPoint3, Vector3 as NaVector3};

pub type Point3 = NaPoint3<f64>;
pub type Vector3 = NaVector3<f64>;
pub type Spacing3 = NaVector3<f64>;
/// Homogeneous 4x4 matrix, e.g. an IJK-to-RAS map.
pub type Matrix4 = NaMatrix4<f64>;

/// Apply a homogeneous affine matrix to a point.
///
/// The bottom row is assumed to be `[0, 0, 0, 1]`; no perspective divide.
pub fn multiply_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    let h = matrix * point.to_homogeneous();
    Point3::new(h[0], h[1], h[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_point_translation() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 1.0;
        m[(1, 3)] = -2.0;
        m[(2, 3)] = 0.5;

        let p = multiply_point(&m, &Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(2.0, -1.0, 1.5));
    }

    #[test]
    fn test_multiply_point_scaling() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 3.0, 4.0));
        let p = multiply_point(&m, &Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(2.0, 3.0, 4.0));
    }
}
