//! Scalar type conversion of a volume's voxel buffer.

use crate::error::Result;
use crate::image::{ScalarType, Volume};

/// Convert a volume's voxels to `scalar_type` in place.
///
/// Integer targets round to nearest and saturate at the type's range.
/// Returns whether the buffer was converted.
pub fn cast_volume(volume: &mut Volume, scalar_type: ScalarType) -> Result<bool> {
    let data = volume.require_data()?;
    let from = data.scalar_type();
    if from == scalar_type {
        return Ok(false);
    }

    tracing::info!(volume = volume.name(), %from, to = %scalar_type, "casting voxel buffer");
    let cast = data.cast(scalar_type);
    volume.set_data(cast)?;
    Ok(true)
}
