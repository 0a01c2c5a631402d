//! Reslicing of one volume onto another volume's sampling grid.
//!
//! [`ResampleImageFilter`] is the tensor kernel: it generates the output
//! grid, pushes it through a transform into input buffer offsets,
//! interpolates, and fills samples outside the input with a background
//! value. [`reslice_affine`] and [`reslice_with_field`] build that transform
//! from volume geometries and write the result into an output volume.
//!
//! All transforms here map output buffer offsets to input buffer offsets;
//! the input volume is never modified.

use std::marker::PhantomData;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rayon::prelude::*;

use crate::error::{CoreError, Result};
use crate::image::grid::{generate_grid_3d, tensor_to_voxels, volume_to_tensor};
use crate::image::{with_voxels, Scalar, ScalarType, Volume, VolumeGeometry, VoxelData};
use crate::interpolation::{
    InterpolationMode, Interpolator, LinearInterpolator, NearestNeighborInterpolator,
};
use crate::spatial::Matrix4;
use crate::transform::matrix::{is_integer_matrix, snap_to_integers};
use crate::transform::{
    compose_displacement_field, ChainedTransform, DisplacementField, GridDisplacement,
    MatrixTransform, Transform,
};

/// Resample image filter.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `T` - The transform type, output offsets to input offsets
/// * `I` - The interpolator type
pub struct ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    size: [usize; 3],
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, T, I> ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `size` - Output grid size `[nx, ny, nz]`
    /// * `transform` - Transform from output offsets to input offsets
    /// * `interpolator` - Interpolator for input sampling
    pub fn new(size: [usize; 3], transform: T, interpolator: I) -> Self {
        Self {
            size,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Resample `input` (`[Z, Y, X]`) onto the output grid.
    ///
    /// Returns the output voxels flattened x fastest.
    pub fn apply(&self, input: &Tensor<B, 3>) -> Tensor<B, 1> {
        let device = input.device();
        let total: usize = self.size.iter().product();

        if total == 0 {
            return Tensor::<B, 1>::zeros([0], &device);
        }
        if input.dims().iter().any(|&d| d == 0) {
            return Tensor::<B, 1>::full([total], self.default_pixel_value, &device);
        }

        // 1. Output buffer offsets
        let output_indices = generate_grid_3d::<B>(self.size, &device);

        // 2. Input buffer offsets
        let input_indices = self.transform.transform_points(output_indices);

        // 3. Interpolate
        let values = self
            .interpolator
            .interpolate(input, input_indices.clone());

        // 4. Background outside the input
        let outside = self.inside_mask(input.dims(), input_indices).lower_elem(0.5);
        values.mask_fill(outside, self.default_pixel_value)
    }

    /// 1.0 where an offset lies within the input (plus the interpolator's
    /// margin), 0.0 elsewhere.
    fn inside_mask(&self, input_dims: [usize; 3], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = input_dims;
        let extent = [d2, d1, d0]; // x, y, z
        let margin = self.interpolator.margin();
        let batch = indices.dims()[0];

        let mut mask = Tensor::<B, 1>::ones([batch], &indices.device());
        for (axis, n) in extent.into_iter().enumerate() {
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let above = coord.clone().greater_equal_elem(-margin).float();
            let below = coord.lower_equal_elem((n - 1) as f64 + margin).float();
            mask = mask * above * below;
        }
        mask
    }
}

fn sample<B, T>(
    input: &Volume,
    size: [usize; 3],
    transform: T,
    interpolation: InterpolationMode,
    background: f64,
    device: &B::Device,
) -> Result<VoxelData>
where
    B: Backend,
    T: Transform<B, 3>,
{
    let scalar_type: ScalarType = input
        .scalar_type()
        .ok_or_else(|| CoreError::missing_data(format!("volume '{}' has no image data", input.name())))?;
    let data = volume_to_tensor::<B>(input, device)?;

    let flat = match interpolation {
        InterpolationMode::NearestNeighbor => {
            ResampleImageFilter::new(size, transform, NearestNeighborInterpolator::new())
                .with_default_pixel_value(background)
                .apply(&data)
        }
        InterpolationMode::Linear => {
            ResampleImageFilter::new(size, transform, LinearInterpolator::new())
                .with_default_pixel_value(background)
                .apply(&data)
        }
        InterpolationMode::Cubic => return Err(unsupported(interpolation)),
    };

    tensor_to_voxels(flat, scalar_type)
}

/// Input voxel index of output offset `offset` under an integer matrix,
/// `None` when it falls outside the input.
fn source_index(matrix: &Matrix4, offset: [usize; 3], dims: [usize; 3]) -> Option<[usize; 3]> {
    let mut index = [0usize; 3];
    for (row, slot) in index.iter_mut().enumerate() {
        let value = (0..3)
            .map(|col| matrix[(row, col)] * offset[col] as f64)
            .sum::<f64>()
            + matrix[(row, 3)];
        if value < 0.0 || value > dims[row] as f64 - 1.0 {
            return None;
        }
        *slot = value as usize;
    }
    Some(index)
}

fn gather_typed<T: Scalar>(values: &[T], sources: &[Option<usize>], background: f64) -> VoxelData {
    let fill = T::from_f64(background);
    T::wrap(sources.iter().map(|s| s.map_or(fill, |i| values[i])).collect())
}

/// Reslice through a matrix that maps voxel centres onto voxel centres.
///
/// Every sample is a copy of one input voxel, so values of any scalar type
/// (NaN and infinities included) come through bit for bit and neither
/// interpolation mode has anything to blend.
fn sample_integer_matrix(input: &Volume, size: [usize; 3], matrix: &Matrix4, background: f64) -> Result<VoxelData> {
    let data = input.require_data()?;
    let matrix = snap_to_integers(matrix);
    let dims = input.dimensions();
    let [nx, ny, nz] = size;

    let sources: Vec<Option<usize>> = (0..nx * ny * nz)
        .into_par_iter()
        .map(|n| {
            let offset = [n % nx, (n / nx) % ny, n / (nx * ny)];
            source_index(&matrix, offset, dims).map(|[x, y, z]| input.offset(x, y, z))
        })
        .collect();

    Ok(with_voxels!(data, v => gather_typed(v.as_slice(), &sources, background)))
}

fn unsupported(interpolation: InterpolationMode) -> CoreError {
    CoreError::unsupported_interpolation(format!("{} interpolation is not implemented", interpolation))
}

fn check_interpolation(interpolation: InterpolationMode) -> Result<()> {
    match interpolation {
        InterpolationMode::Cubic => Err(unsupported(interpolation)),
        InterpolationMode::NearestNeighbor | InterpolationMode::Linear => Ok(()),
    }
}

/// Matrix from output buffer offsets to input buffer offsets for an affine
/// reslice.
///
/// `G_in^-1 * RASToIJK_in * T * IJKToRAS_out * G_out`, where `G` maps
/// buffer offsets to grid coordinates and `T` is the user transform in
/// physical space.
pub fn affine_sampling_matrix(
    input: &VolumeGeometry,
    output: &VolumeGeometry,
    user_transform: Option<&Matrix4>,
) -> Result<Matrix4> {
    let user = user_transform.copied().unwrap_or_else(Matrix4::identity);
    Ok(input.grid_to_offset()? * input.ras_to_ijk()? * user * output.ijk_to_ras * output.offset_to_grid())
}

/// Reslice `input` into `output` through an affine transform.
///
/// The output takes `geometry_ref`'s geometry, or keeps its own when none
/// is given, and receives a fresh buffer of the input's scalar type.
/// `user_transform` maps output physical points to input physical points.
/// Samples falling outside the input get `background`.
///
/// When the combined matrix is integral after snapping, voxels are copied
/// straight from the input buffer and the tensor resampler is skipped.
pub fn reslice_affine<B: Backend>(
    input: &Volume,
    output: &mut Volume,
    geometry_ref: Option<&VolumeGeometry>,
    user_transform: Option<&Matrix4>,
    interpolation: InterpolationMode,
    background: f64,
    device: &B::Device,
) -> Result<()> {
    check_interpolation(interpolation)?;
    input.require_data()?;

    let geometry = geometry_ref.unwrap_or_else(|| output.geometry()).clone();
    let matrix = affine_sampling_matrix(input.geometry(), &geometry, user_transform)?;
    let integer_matrix = is_integer_matrix(&matrix);
    tracing::debug!(
        input = input.name(),
        output = output.name(),
        %interpolation,
        background,
        integer_matrix,
        "affine reslice"
    );

    let data = if integer_matrix {
        sample_integer_matrix(input, geometry.dimensions(), &matrix, background)?
    } else {
        let transform = MatrixTransform::<B>::from_matrix(&matrix, device);
        sample(input, geometry.dimensions(), transform, interpolation, background, device)?
    };

    output.copy_orientation(&geometry);
    output.set_data(data)
}

/// Reslice `input` into `output` through a dense displacement field.
///
/// `field` maps output physical points to input physical points. It is
/// composed with the output index-to-physical map and the input
/// physical-to-index map into one displacement per output grid point,
/// then sampled like [`reslice_affine`].
pub fn reslice_with_field<B: Backend>(
    input: &Volume,
    output: &mut Volume,
    geometry_ref: Option<&VolumeGeometry>,
    field: &DisplacementField,
    interpolation: InterpolationMode,
    background: f64,
    device: &B::Device,
) -> Result<()> {
    check_interpolation(interpolation)?;
    input.require_data()?;

    let geometry = geometry_ref.unwrap_or_else(|| output.geometry()).clone();
    let composed = compose_displacement_field(
        field,
        &geometry.ijk_to_ras,
        &input.geometry().ras_to_ijk()?,
        &geometry,
    )?;
    tracing::debug!(
        input = input.name(),
        output = output.name(),
        %interpolation,
        background,
        "deformable reslice"
    );

    let to_grid = MatrixTransform::<B>::from_matrix(&geometry.offset_to_grid(), device);
    let displace = GridDisplacement::<B>::from_field(&composed, device);
    let to_input = MatrixTransform::<B>::from_matrix(&input.geometry().grid_to_offset()?, device);
    let transform = ChainedTransform::new(ChainedTransform::new(to_grid, displace), to_input);

    let data = sample(input, geometry.dimensions(), transform, interpolation, background, device)?;

    output.copy_orientation(&geometry);
    output.set_data(data)
}
