use emseg_core::{Volume, VolumeGeometry, VoxelData};
use emseg_segment::{
    define_valid_segmentation_boundary, validate_boundary, ClassNode, ClassTree, DiagnosticKind, SegmentError,
    VolumeRole, VolumeStore,
};
use proptest::prelude::*;

#[test]
fn test_zero_min_resets_every_axis() {
    let check = validate_boundary([10, 10, 10], [0, 1, 1], [5, 5, 5]);
    assert!(check.was_corrected);
    assert_eq!(check.min, [1, 1, 1]);
    assert_eq!(check.max, [10, 10, 10]);
}

#[test]
fn test_inverted_axis_is_corrected() {
    let check = validate_boundary([8, 9, 10], [1, 6, 1], [8, 5, 10]);
    assert!(check.was_corrected);
    assert_eq!(check.max, [8, 9, 10]);
}

#[test]
fn test_node_boundary_is_checked_against_first_channel() {
    let mut tree = ClassTree::new();
    let root = tree
        .set_root(ClassNode::branch("root").with_boundary([1, 1, 1], [12, 10, 10]))
        .unwrap();
    let volumes = VolumeStore::new()
        .with(
            VolumeRole::TargetChannel(0),
            Volume::new("t1", VolumeGeometry::from_dimensions([10, 10, 10]), VoxelData::from(vec![0u8; 1000]))
                .unwrap(),
        )
        .with(
            VolumeRole::TargetChannel(1),
            Volume::new("t2", VolumeGeometry::from_dimensions([12, 10, 10]), VoxelData::from(vec![0u8; 1200]))
                .unwrap(),
        );

    let (check, diagnostics) = define_valid_segmentation_boundary(&mut tree, &volumes, root).unwrap();

    assert!(check.was_corrected);
    assert_eq!(diagnostics.count(DiagnosticKind::BoundaryCorrected), 1);
    assert_eq!(tree.get(root).unwrap().boundary_max, [10, 10, 10]);

    let (again, diagnostics) = define_valid_segmentation_boundary(&mut tree, &volumes, root).unwrap();
    assert!(!again.was_corrected);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_missing_target_is_an_error() {
    let mut tree = ClassTree::new();
    let root = tree.set_root(ClassNode::branch("root")).unwrap();
    let err = define_valid_segmentation_boundary(&mut tree, &VolumeStore::new(), root).unwrap_err();
    assert!(matches!(err, SegmentError::MissingData(_)));
}

fn dims_and_bounds() -> impl Strategy<Value = ([usize; 3], [i32; 3], [i32; 3])> {
    (
        prop::array::uniform3(1usize..40),
        prop::array::uniform3(-3i32..45),
        prop::array::uniform3(-3i32..45),
    )
}

proptest! {
    #[test]
    fn prop_result_is_always_valid((dims, min, max) in dims_and_bounds()) {
        let check = validate_boundary(dims, min, max);
        for axis in 0..3 {
            prop_assert!(1 <= check.min[axis]);
            prop_assert!(check.min[axis] <= check.max[axis]);
            prop_assert!(check.max[axis] as usize <= dims[axis]);
        }
        prop_assert!(!validate_boundary(dims, check.min, check.max).was_corrected);
    }

    #[test]
    fn prop_correction_is_all_or_nothing((dims, min, max) in dims_and_bounds()) {
        let check = validate_boundary(dims, min, max);
        if check.was_corrected {
            prop_assert_eq!(check.min, [1, 1, 1]);
            prop_assert_eq!(check.max, dims.map(|d| d as i32));
        } else {
            prop_assert_eq!(check.min, min);
            prop_assert_eq!(check.max, max);
        }
    }
}
