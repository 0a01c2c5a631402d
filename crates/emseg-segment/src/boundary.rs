//! Segmentation boundary (region of interest) validation.
//!
//! Boundaries are 1-based and inclusive on every axis. A boundary that is
//! wrong on any axis is replaced by the whole volume on all three axes.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, SegmentError};
use crate::repository::{TreeRepository, VolumeRepository, VolumeRole};
use crate::tree::NodeId;

/// Result of [`validate_boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryCheck {
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub was_corrected: bool,
}

fn axis_is_valid(dim: usize, min: i32, max: i32) -> bool {
    let dim = dim as i64;
    let (min, max) = (min as i64, max as i64);
    (1..=dim).contains(&min) && (1..=dim).contains(&max) && min <= max
}

/// Check a boundary against the volume dimensions.
///
/// If any axis has `min < 1`, `min > dim`, `max < 1`, `max > dim` or
/// `max < min`, every axis is reset to `[1, dim]`.
pub fn validate_boundary(dims: [usize; 3], min: [i32; 3], max: [i32; 3]) -> BoundaryCheck {
    if (0..3).all(|axis| axis_is_valid(dims[axis], min[axis], max[axis])) {
        return BoundaryCheck {
            min,
            max,
            was_corrected: false,
        };
    }

    BoundaryCheck {
        min: [1; 3],
        max: dims.map(|d| d.min(i32::MAX as usize) as i32),
        was_corrected: true,
    }
}

fn describe(dims: [usize; 3], min: [i32; 3], max: [i32; 3]) -> String {
    let axes: Vec<String> = (0..3)
        .map(|axis| {
            format!(
                "axis {}: 1 <= min({}) <= max({}) <= {}",
                axis, min[axis], max[axis], dims[axis]
            )
        })
        .collect();
    format!(
        "segmentation boundary out of range, using the whole volume; {}",
        axes.join("; ")
    )
}

/// Validate a node's boundary and write the corrected bounds back.
pub fn correct_node_boundary<T: TreeRepository + ?Sized>(
    tree: &mut T,
    node: NodeId,
    dims: [usize; 3],
    diagnostics: &mut Diagnostics,
) -> Result<BoundaryCheck> {
    let class = tree.require_node_mut(node)?;
    let check = validate_boundary(dims, class.boundary_min, class.boundary_max);
    if check.was_corrected {
        diagnostics.warn(
            DiagnosticKind::BoundaryCorrected,
            Some(node),
            describe(dims, class.boundary_min, class.boundary_max),
        );
        class.boundary_min = check.min;
        class.boundary_max = check.max;
    }
    Ok(check)
}

/// Validate a node's boundary against the first target channel.
///
/// The first selected channel is the reference even when the channels
/// differ in geometry.
pub fn define_valid_segmentation_boundary<T, V>(
    tree: &mut T,
    volumes: &V,
    node: NodeId,
) -> Result<(BoundaryCheck, Diagnostics)>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    let reference = volumes
        .volume(VolumeRole::TargetChannel(0))
        .ok_or_else(|| SegmentError::missing_data("no target channel selected"))?;
    let mut diagnostics = Diagnostics::new();
    let check = correct_node_boundary(tree, node, reference.dimensions(), &mut diagnostics)?;
    Ok((check, diagnostics))
}
