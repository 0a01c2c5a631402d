use burn_ndarray::NdArray;
use emseg_core::filter::{reslice_affine, reslice_with_field};
use emseg_core::image::{Scalar, ScalarType, Volume, VolumeGeometry, VoxelData};
use emseg_core::spatial::{Matrix4, Point3, Spacing3, Vector3};
use emseg_core::transform::DisplacementField;
use emseg_core::{CoreError, InterpolationMode};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

type B = NdArray<f32>;

fn volume(dims: [usize; 3], values: VoxelData) -> Volume {
    Volume::new("input", VolumeGeometry::from_dimensions(dims), values).unwrap()
}

#[test]
fn test_identity_reslice_keeps_float_values() {
    let device = Default::default();
    let values: Vec<f32> = (0..60).map(|i| (i as f32) * 0.37 - 4.0).collect();
    let input = volume([5, 4, 3], VoxelData::from(values));
    let mut output = Volume::empty("output", input.geometry().clone());

    reslice_affine::<B>(
        &input,
        &mut output,
        None,
        Some(&Matrix4::identity()),
        InterpolationMode::Linear,
        0.0,
        &device,
    )
    .unwrap();

    assert_eq!(output.data(), input.data());
}

#[test]
fn test_permutation_reslice() {
    let device = Default::default();
    // swap x and y: output (x, y, z) samples input (y, x, z)
    let values: Vec<u16> = (0..12).collect();
    let input = volume([3, 4, 1], VoxelData::from(values));
    let mut output = Volume::empty("output", VolumeGeometry::from_dimensions([4, 3, 1]));

    let mut swap = Matrix4::zeros();
    swap[(0, 1)] = 1.0;
    swap[(1, 0)] = 1.0;
    swap[(2, 2)] = 1.0;
    swap[(3, 3)] = 1.0;

    reslice_affine::<B>(
        &input,
        &mut output,
        None,
        Some(&swap),
        InterpolationMode::NearestNeighbor,
        0.0,
        &device,
    )
    .unwrap();

    let out = output.data().unwrap().as_slice::<u16>().unwrap();
    // output (x=2, y=1) <- input (x=1, y=2) = 1 + 3 * 2
    assert_eq!(out[2 + 4], 7);
    // output (x=3, y=0) <- input (x=0, y=3) = 9
    assert_eq!(out[3], 9);
}

#[test]
fn test_zero_field_matches_affine() {
    let device = Default::default();
    let values: Vec<f32> = (0..64).map(|i| ((i * 7) % 13) as f32).collect();
    let mut input = volume([4, 4, 4], VoxelData::from(values));

    // input sits one voxel to the right in physical space
    let mut shifted = Matrix4::identity();
    shifted[(0, 3)] = 1.0;
    input.copy_orientation(&input.geometry().clone().with_ijk_to_ras(shifted));

    let geometry = VolumeGeometry::from_dimensions([4, 4, 4]);
    let field = DisplacementField::zeros(geometry.clone()).unwrap();

    for mode in [InterpolationMode::Linear, InterpolationMode::NearestNeighbor] {
        let mut affine = Volume::empty("affine", geometry.clone());
        reslice_affine::<B>(&input, &mut affine, None, None, mode, -1.0, &device).unwrap();

        let mut deformable = Volume::empty("deformable", geometry.clone());
        reslice_with_field::<B>(&input, &mut deformable, None, &field, mode, -1.0, &device).unwrap();

        assert_eq!(affine.data(), deformable.data(), "{mode}");
        // x = 0 falls off the input
        assert_eq!(affine.data().unwrap().value_f64(0), Some(-1.0));
    }
}

#[test]
fn test_field_over_spaced_grid() {
    let device = Default::default();
    let values: Vec<i32> = (0..8).map(|i| i * 10).collect();
    let input = volume([8, 1, 1], VoxelData::from(values));

    // output grid at twice the input spacing
    let geometry = VolumeGeometry::new(
        [0, 3, 0, 0, 0, 0],
        Spacing3::new(2.0, 1.0, 1.0),
        Point3::origin(),
        Matrix4::identity(),
    );
    let field = DisplacementField::new(geometry.clone(), vec![Vector3::new(1.0, 0.0, 0.0); 4]).unwrap();

    let mut output = Volume::empty("output", VolumeGeometry::from_dimensions([1, 1, 1]));
    reslice_with_field::<B>(
        &input,
        &mut output,
        Some(&geometry),
        &field,
        InterpolationMode::Linear,
        0.0,
        &device,
    )
    .unwrap();

    assert_eq!(output.geometry(), &geometry);
    assert_eq!(output.scalar_type(), Some(ScalarType::I32));
    // grid points 0, 2, 4, 6 sample input x 1, 3, 5, 7
    assert_eq!(output.data().unwrap().as_slice::<i32>(), Some(&[10, 30, 50, 70][..]));
}

#[test]
fn test_input_is_not_modified() {
    let device = Default::default();
    let input = volume([3, 3, 3], VoxelData::from(vec![5u8; 27]));
    let before = input.clone();
    let mut output = Volume::empty("output", VolumeGeometry::from_dimensions([2, 2, 2]));

    let mut shift = Matrix4::identity();
    shift[(2, 3)] = 0.5;
    reslice_affine::<B>(
        &input,
        &mut output,
        None,
        Some(&shift),
        InterpolationMode::Linear,
        0.0,
        &device,
    )
    .unwrap();

    assert_eq!(input, before);
    assert_eq!(output.data().unwrap().as_slice::<u8>(), Some(&[5u8; 8][..]));
}

#[test]
fn test_cubic_is_an_error() {
    let device = Default::default();
    let input = volume([2, 2, 2], VoxelData::from(vec![0i16; 8]));
    let mut output = Volume::empty("output", input.geometry().clone());
    let result = reslice_affine::<B>(
        &input,
        &mut output,
        None,
        None,
        InterpolationMode::Cubic,
        0.0,
        &device,
    );
    assert!(matches!(result, Err(CoreError::UnsupportedInterpolation(_))));
}

fn identity_reslice(input: &Volume, mode: InterpolationMode) -> Volume {
    let device = Default::default();
    let mut output = Volume::empty("output", input.geometry().clone());
    reslice_affine::<B>(
        input,
        &mut output,
        None,
        Some(&Matrix4::identity()),
        mode,
        0.0,
        &device,
    )
    .unwrap();
    output
}

/// Bitwise equality, so NaN matches NaN.
fn same_voxels<T: Scalar>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.key() == y.key())
}

#[test]
fn test_identity_reslice_keeps_f64_precision() {
    let values = vec![0.1f64, 1.0 / 3.0, 2.5];
    let input = volume([3, 1, 1], VoxelData::from(values.clone()));
    let output = identity_reslice(&input, InterpolationMode::Linear);
    assert_eq!(output.data().unwrap().as_slice::<f64>(), Some(values.as_slice()));
}

#[test]
fn test_identity_reslice_keeps_wide_integers() {
    let values = vec![16_777_217i32, 100_000_001, 5];
    let input = volume([3, 1, 1], VoxelData::from(values.clone()));
    let output = identity_reslice(&input, InterpolationMode::Linear);
    assert_eq!(output.data().unwrap().as_slice::<i32>(), Some(values.as_slice()));

    let values = vec![u64::MAX, 1 << 60, 3];
    let input = volume([1, 3, 1], VoxelData::from(values.clone()));
    let output = identity_reslice(&input, InterpolationMode::NearestNeighbor);
    assert_eq!(output.data().unwrap().as_slice::<u64>(), Some(values.as_slice()));
}

#[test]
fn test_nan_voxel_does_not_spread() {
    let values = vec![1.0f32, f32::NAN, 3.0];
    let input = volume([3, 1, 1], VoxelData::from(values.clone()));

    let output = identity_reslice(&input, InterpolationMode::Linear);
    let out = output.data().unwrap().as_slice::<f32>().unwrap();
    assert!(same_voxels(out, &values), "{out:?}");

    // the tensor path used by deformable reslicing keeps it local too
    let device = Default::default();
    let field = DisplacementField::zeros(input.geometry().clone()).unwrap();
    let mut deformable = Volume::empty("deformable", input.geometry().clone());
    reslice_with_field::<B>(
        &input,
        &mut deformable,
        None,
        &field,
        InterpolationMode::Linear,
        0.0,
        &device,
    )
    .unwrap();
    let out = deformable.data().unwrap().as_slice::<f32>().unwrap();
    assert_eq!(out[0], 1.0);
    assert!(out[1].is_nan());
    assert_eq!(out[2], 3.0);
}

fn check_identity<T: Scalar>(dims: [usize; 3], values: &[T]) -> Result<(), TestCaseError> {
    let n: usize = dims.iter().product();
    let input = volume(dims, VoxelData::from(values[..n].to_vec()));

    for mode in [InterpolationMode::Linear, InterpolationMode::NearestNeighbor] {
        let once = identity_reslice(&input, mode);
        let twice = identity_reslice(&once, mode);
        prop_assert_eq!(once.scalar_type(), Some(T::SCALAR_TYPE));
        let once = once.data().unwrap().as_slice::<T>().unwrap();
        let twice = twice.data().unwrap().as_slice::<T>().unwrap();
        prop_assert!(same_voxels(once, &values[..n]), "{:?} -> {:?}", &values[..n], once);
        prop_assert!(same_voxels(twice, once));
    }
    Ok(())
}

macro_rules! identity_reslice_props {
    ($($name:ident: $t:ty),* $(,)?) => {
        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]
            $(
                #[test]
                fn $name(
                    dims in proptest::array::uniform3(1usize..5),
                    values in proptest::collection::vec(any::<$t>(), 64)
                ) {
                    check_identity(dims, &values)?;
                }
            )*
        }
    };
}

identity_reslice_props! {
    test_identity_reslice_is_idempotent_u8: u8,
    test_identity_reslice_is_idempotent_i8: i8,
    test_identity_reslice_is_idempotent_u16: u16,
    test_identity_reslice_is_idempotent_i16: i16,
    test_identity_reslice_is_idempotent_u32: u32,
    test_identity_reslice_is_idempotent_i32: i32,
    test_identity_reslice_is_idempotent_u64: u64,
    test_identity_reslice_is_idempotent_i64: i64,
    test_identity_reslice_is_idempotent_f32: f32,
    test_identity_reslice_is_idempotent_f64: f64,
}
