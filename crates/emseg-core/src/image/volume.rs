//! Volume: a named geometry with an optional voxel buffer.

use serde::{Deserialize, Serialize};

use super::geometry::VolumeGeometry;
use super::voxel::{ScalarType, VoxelData};
use crate::error::{CoreError, Result};

/// In-memory volume.
///
/// The voxel buffer is optional: a volume node can exist (and carry a
/// geometry) before any image data has been attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    name: String,
    geometry: VolumeGeometry,
    data: Option<VoxelData>,
}

impl Volume {
    /// Create a volume, checking the buffer length against the geometry.
    pub fn new(name: impl Into<String>, geometry: VolumeGeometry, data: VoxelData) -> Result<Self> {
        let expected = geometry.num_voxels();
        if data.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected: geometry.dimensions().to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            name: name.into(),
            geometry,
            data: Some(data),
        })
    }

    /// A volume node without image data.
    pub fn empty(name: impl Into<String>, geometry: VolumeGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.geometry.dimensions()
    }

    pub fn data(&self) -> Option<&VoxelData> {
        self.data.as_ref()
    }

    /// Voxel buffer, or a missing-data error naming the volume.
    pub fn require_data(&self) -> Result<&VoxelData> {
        self.data
            .as_ref()
            .ok_or_else(|| CoreError::missing_data(format!("volume '{}' has no image data", self.name)))
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        self.data.as_ref().map(VoxelData::scalar_type)
    }

    /// Adopt another geometry, keeping the voxel buffer only if it still fits.
    pub fn copy_orientation(&mut self, geometry: &VolumeGeometry) {
        self.geometry = geometry.clone();
        if self
            .data
            .as_ref()
            .is_some_and(|d| d.len() != self.geometry.num_voxels())
        {
            self.data = None;
        }
    }

    /// Replace the voxel buffer; its length must match the geometry.
    pub fn set_data(&mut self, data: VoxelData) -> Result<()> {
        if data.len() != self.geometry.num_voxels() {
            return Err(CoreError::ShapeMismatch {
                expected: self.geometry.dimensions().to_vec(),
                actual: vec![data.len()],
            });
        }
        self.data = Some(data);
        Ok(())
    }

    /// Flat buffer offset of `(x, y, z)`.
    pub fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        let [nx, ny, _] = self.dimensions();
        x + nx * (y + ny * z)
    }
}

/// Two volumes share a sampling grid.
///
/// Fails closed: a volume without image data never matches.
pub fn geometries_equal(lhs: &Volume, rhs: &Volume) -> bool {
    if lhs.data().is_none() || rhs.data().is_none() {
        return false;
    }
    lhs.geometry().matches(rhs.geometry())
}
