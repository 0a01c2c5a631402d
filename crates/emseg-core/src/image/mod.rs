//! Volume types and operations.
//!
//! This module provides the Volume type, its sampling geometry and the
//! typed voxel buffers, plus the conversions to and from tensors used by
//! the resampler.

pub mod geometry;
pub mod grid;
pub mod volume;
pub mod voxel;

pub use geometry::VolumeGeometry;
pub use grid::{generate_grid_3d, volume_to_tensor};
pub use volume::{geometries_equal, Volume};
pub(crate) use voxel::with_voxels;
pub use voxel::{Scalar, ScalarType, VoxelData};
