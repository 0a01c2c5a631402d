use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use super::volume::Volume;
use super::voxel::VoxelData;
use crate::error::{CoreError, Result};

/// Generate the buffer offsets of every voxel of a 3D grid.
///
/// Returns a tensor of shape `[N, 3]` where N is the total number of voxels.
/// Rows are `(x, y, z)` with x varying fastest, matching the voxel buffer
/// layout, so row `n` belongs to flat offset `n`.
///
/// # Arguments
/// * `dims` - The grid size `[nx, ny, nz]`
/// * `device` - The device to create the tensor on
pub fn generate_grid_3d<B>(dims: [usize; 3], device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
{
    let [nx, ny, nz] = dims;
    let total = nx * ny * nz;

    let mut grid = Vec::with_capacity(total * 3);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}

/// Upload a volume's voxels as a `[nz, ny, nx]` float tensor.
pub fn volume_to_tensor<B: Backend>(volume: &Volume, device: &B::Device) -> Result<Tensor<B, 3>> {
    let data = volume.require_data()?;
    let [nx, ny, nz] = volume.dimensions();
    let values = data.to_f32_vec();
    Ok(Tensor::<B, 1>::from_data(TensorData::new(values, Shape::new([nx * ny * nz])), device)
        .reshape([nz, ny, nx]))
}

/// Read a flat tensor back into host memory.
pub fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 1>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| CoreError::tensor_data(format!("{:?}", e)))
}

/// Read a flat tensor back as a voxel buffer of the requested scalar type.
pub fn tensor_to_voxels<B: Backend>(
    tensor: Tensor<B, 1>,
    scalar_type: super::voxel::ScalarType,
) -> Result<VoxelData> {
    let values: Vec<f64> = tensor_to_vec(tensor)?.into_iter().map(f64::from).collect();
    Ok(VoxelData::from_f64_slice(scalar_type, &values))
}
