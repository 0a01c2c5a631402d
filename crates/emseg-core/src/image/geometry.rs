//! Sampling grid of a volume and its index-to-physical map.
//!
//! A [`VolumeGeometry`] carries two layers, mirroring how scanner volumes
//! are usually stored:
//! * **Grid coordinates**: `origin + spacing * index`, where `index` is the
//!   absolute index inside `extent`.
//! * **Physical (RAS) space**: the `ijk_to_ras` matrix applied to grid
//!   coordinates. With the common `origin = 0, spacing = 1` grid, grid
//!   coordinates are IJK indices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::spatial::{multiply_point, Matrix4, Point3, Spacing3};

/// Scale used when comparing matrix entries: five decimal digits.
const MATRIX_COMPARE_SCALE: f64 = 100_000.0;

/// Geometry of a 3D volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    /// `[i_min, i_max, j_min, j_max, k_min, k_max]`, inclusive.
    pub extent: [i32; 6],
    pub spacing: Spacing3,
    pub origin: Point3,
    /// Grid coordinates to physical space.
    pub ijk_to_ras: Matrix4,
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self::from_dimensions([1, 1, 1])
    }
}

impl VolumeGeometry {
    pub fn new(extent: [i32; 6], spacing: Spacing3, origin: Point3, ijk_to_ras: Matrix4) -> Self {
        Self {
            extent,
            spacing,
            origin,
            ijk_to_ras,
        }
    }

    /// Zero-based grid of the given size with unit spacing and an identity
    /// index-to-physical map.
    pub fn from_dimensions(dims: [usize; 3]) -> Self {
        let extent = [
            0,
            dims[0] as i32 - 1,
            0,
            dims[1] as i32 - 1,
            0,
            dims[2] as i32 - 1,
        ];
        Self::new(
            extent,
            Spacing3::new(1.0, 1.0, 1.0),
            Point3::origin(),
            Matrix4::identity(),
        )
    }

    /// Replace the index-to-physical map.
    pub fn with_ijk_to_ras(mut self, ijk_to_ras: Matrix4) -> Self {
        self.ijk_to_ras = ijk_to_ras;
        self
    }

    /// Number of samples along each axis; an inverted extent yields zero.
    pub fn dimensions(&self) -> [usize; 3] {
        let mut dims = [0usize; 3];
        for (axis, dim) in dims.iter_mut().enumerate() {
            let len = self.extent[2 * axis + 1] - self.extent[2 * axis] + 1;
            *dim = len.max(0) as usize;
        }
        dims
    }

    pub fn num_voxels(&self) -> usize {
        self.dimensions().iter().product()
    }

    /// Physical-to-grid map, the inverse of `ijk_to_ras`.
    pub fn ras_to_ijk(&self) -> Result<Matrix4> {
        self.ijk_to_ras.try_inverse().ok_or_else(|| {
            CoreError::transform(format!(
                "IJK to RAS matrix is not invertible: {}",
                self.ijk_to_ras
            ))
        })
    }

    /// Buffer offsets `(x, y, z)` to grid coordinates.
    pub fn offset_to_grid(&self) -> Matrix4 {
        let mut m = Matrix4::identity();
        for axis in 0..3 {
            m[(axis, axis)] = self.spacing[axis];
            m[(axis, 3)] = self.origin[axis] + self.spacing[axis] * self.extent[2 * axis] as f64;
        }
        m
    }

    /// Grid coordinates to buffer offsets.
    pub fn grid_to_offset(&self) -> Result<Matrix4> {
        if (0..3).any(|axis| self.spacing[axis] == 0.0) {
            return Err(CoreError::transform(format!(
                "grid spacing must be non-zero, got {:?}",
                self.spacing.as_slice()
            )));
        }
        let mut m = Matrix4::identity();
        for axis in 0..3 {
            let inv = 1.0 / self.spacing[axis];
            m[(axis, axis)] = inv;
            m[(axis, 3)] = -self.origin[axis] * inv - self.extent[2 * axis] as f64;
        }
        Ok(m)
    }

    /// Grid coordinates of the sample at buffer offset `(x, y, z)`.
    pub fn grid_point(&self, offset: [usize; 3]) -> Point3 {
        Point3::new(
            self.origin[0] + self.spacing[0] * (self.extent[0] as f64 + offset[0] as f64),
            self.origin[1] + self.spacing[1] * (self.extent[2] as f64 + offset[1] as f64),
            self.origin[2] + self.spacing[2] * (self.extent[4] as f64 + offset[2] as f64),
        )
    }

    /// Physical position of an integer index.
    pub fn ijk_to_ras_point(&self, ijk: [i32; 3]) -> Point3 {
        let p = Point3::new(ijk[0] as f64, ijk[1] as f64, ijk[2] as f64);
        multiply_point(&self.ijk_to_ras, &p)
    }

    /// Integer index of a physical position, truncated toward zero.
    pub fn ras_to_ijk_point(&self, ras: &Point3) -> Result<[i32; 3]> {
        let p = multiply_point(&self.ras_to_ijk()?, ras);
        Ok([p[0] as i32, p[1] as i32, p[2] as i32])
    }

    /// Extent equal and every matrix entry equal to five decimal digits.
    ///
    /// Entries are scaled by 1e5 and truncated toward zero before comparing,
    /// which absorbs round-off from repeated transform composition.
    pub fn matches(&self, other: &VolumeGeometry) -> bool {
        if self.extent != other.extent {
            return false;
        }
        self.ijk_to_ras
            .iter()
            .zip(other.ijk_to_ras.iter())
            .all(|(a, b)| truncate_entry(*a) == truncate_entry(*b))
    }
}

fn truncate_entry(value: f64) -> i64 {
    (value * MATRIX_COMPARE_SCALE).trunc() as i64
}

impl fmt::Display for VolumeGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.extent;
        writeln!(
            f,
            "Spacing: {} {} {}",
            self.spacing[0], self.spacing[1], self.spacing[2]
        )?;
        writeln!(
            f,
            "Origin: {} {} {}",
            self.origin[0], self.origin[1], self.origin[2]
        )?;
        writeln!(f, "Extent: {} {} {} {} {} {}", e[0], e[1], e[2], e[3], e[4], e[5])?;
        write!(f, "IJKtoRAS Matrix:")?;
        for r in 0..4 {
            write!(f, "\n  ")?;
            for c in 0..4 {
                write!(f, " {}", self.ijk_to_ras[(r, c)])?;
            }
        }
        Ok(())
    }
}
