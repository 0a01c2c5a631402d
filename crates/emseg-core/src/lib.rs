//! Volume preparation for hierarchical tissue segmentation.
//!
//! Geometry, voxel buffers, background estimation and affine or deformable
//! reslicing of scan volumes onto a common grid.

pub mod error;
pub mod filter;
pub mod image;
pub mod interpolation;
pub mod spatial;
pub mod transform;

pub use error::{CoreError, Result};
pub use image::{geometries_equal, ScalarType, Volume, VolumeGeometry, VoxelData};
pub use interpolation::InterpolationMode;
pub use spatial::{Matrix4, Point3, Spacing3, Vector3};
