use emseg_core::filter::{estimate_background, guess_background_level};
use emseg_core::image::{Volume, VolumeGeometry, VoxelData};

fn volume<T: emseg_core::image::Scalar>(dims: [usize; 3], values: Vec<T>) -> Volume {
    Volume::new("scan", VolumeGeometry::from_dimensions(dims), VoxelData::from(values)).unwrap()
}

#[test]
fn test_border_majority_is_background() {
    // 20^3 volume: the interior is bright tissue, the border slabs hold
    // 100 with every tenth voxel set to 200
    let n = 20;
    let mut values = vec![0u8; n * n * n];
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let offset = x + n * (y + n * z);
                let on_border = [x, y, z].iter().any(|&c| c < 5 || c >= n - 5);
                values[offset] = if !on_border {
                    250
                } else if offset % 10 == 0 {
                    200
                } else {
                    100
                };
            }
        }
    }

    let scan = volume([n, n, n], values);
    assert_eq!(estimate_background(&scan).unwrap(), 100.0);
}

#[test]
fn test_interior_does_not_vote() {
    // a large bright interior cannot outvote the border
    let n = 12;
    let mut values = vec![30i16; n * n * n];
    for z in 5..7 {
        for y in 5..7 {
            for x in 5..7 {
                values[x + n * (y + n * z)] = 1000;
            }
        }
    }
    let guess = guess_background_level(&values, [n, n, n]);
    assert_eq!(guess.level, 30);
    assert!(guess.runner_up.is_none());
}

#[test]
fn test_thin_volume_clamps_slabs() {
    // two slices only: both z slabs cover the whole volume
    let values: Vec<f32> = vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0, 5.0];
    let guess = guess_background_level(&values, [2, 2, 2]);
    assert_eq!(guess.level, 5.0);
    assert_eq!(guess.voxels_counted, 48);
}
