use emseg_core::image::{geometries_equal, Volume, VolumeGeometry, VoxelData};
use emseg_core::spatial::{multiply_point, Matrix4, Point3};
use proptest::prelude::*;

fn make_rotation(angle_x: f64, angle_y: f64, angle_z: f64) -> nalgebra::Matrix3<f64> {
    let (sx, cx) = angle_x.sin_cos();
    let (sy, cy) = angle_y.sin_cos();
    let (sz, cz) = angle_z.sin_cos();

    let rz = nalgebra::Matrix3::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
    let ry = nalgebra::Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rx = nalgebra::Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);

    rx * ry * rz
}

fn ijk_to_ras(rotation: nalgebra::Matrix3<f64>, spacing: [f64; 3], origin: [f64; 3]) -> Matrix4 {
    let scaled = rotation * nalgebra::Matrix3::from_diagonal(&nalgebra::Vector3::from(spacing));
    let mut m = scaled.to_homogeneous();
    for axis in 0..3 {
        m[(axis, 3)] = origin[axis];
    }
    m
}

fn volume_with(matrix: Matrix4) -> Volume {
    let geometry = VolumeGeometry::from_dimensions([3, 3, 3]).with_ijk_to_ras(matrix);
    Volume::new("v", geometry, VoxelData::from(vec![0u8; 27])).unwrap()
}

#[test]
fn test_geometry_equality_tolerance() {
    let mut m = Matrix4::identity();
    m[(0, 0)] = -0.9375;
    m[(0, 3)] = 120.0;

    let mut close = m;
    close[(0, 3)] += 1e-6;
    let mut far = m;
    far[(0, 3)] += 1e-4;

    assert!(geometries_equal(&volume_with(m), &volume_with(close)));
    assert!(!geometries_equal(&volume_with(m), &volume_with(far)));
}

proptest! {
    #[test]
    fn test_ras_ijk_roundtrip(
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        i in 0.0f64..255.0, j in 0.0f64..255.0, k in 0.0f64..60.0
    ) {
        let m = ijk_to_ras(make_rotation(ax, ay, az), [sx, sy, sz], [ox, oy, oz]);
        let geometry = VolumeGeometry::from_dimensions([256, 256, 61]).with_ijk_to_ras(m);

        let ijk = Point3::new(i, j, k);
        let ras = multiply_point(&geometry.ijk_to_ras, &ijk);
        let recovered = multiply_point(&geometry.ras_to_ijk().unwrap(), &ras);

        prop_assert!((ijk - recovered).norm() < 1e-6, "{} vs {}", ijk, recovered);
    }

    #[test]
    fn test_equality_absorbs_sub_tolerance_noise(
        entries in proptest::collection::vec(-2000i32..2000, 16),
        row in 0usize..4, col in 0usize..4
    ) {
        // multiples of 1/8 scale to whole numbers at five decimal digits
        let m = Matrix4::from_iterator(entries.iter().map(|&e| e as f64 / 8.0));
        let away_from_zero = if m[(row, col)] >= 0.0 { 1.0 } else { -1.0 };

        let mut close = m;
        close[(row, col)] += 1e-6 * away_from_zero;
        let mut far = m;
        far[(row, col)] += 1e-4 * away_from_zero;

        prop_assert!(geometries_equal(&volume_with(m), &volume_with(close)));
        prop_assert!(!geometries_equal(&volume_with(m), &volume_with(far)));
    }

    #[test]
    fn test_equality_requires_same_extent(extra in 1i32..10) {
        let a = VolumeGeometry::from_dimensions([3, 3, 3]);
        let mut b = a.clone();
        b.extent[5] += extra;
        prop_assert!(!a.matches(&b));
    }
}
