//! Sub-parcellation of a finished label map.

use emseg_core::image::Scalar;
use emseg_core::{CoreError, Volume, VoxelData};
use tracing::info;

use crate::error::Result;
use crate::repository::{TreeRepository, VolumeRepository, VolumeRole};
use crate::tree::NodeId;

fn relabel<T: Scalar>(segmentation: &[T], parcellation: &[f64], label: f64) -> VoxelData {
    let values = segmentation
        .iter()
        .zip(parcellation)
        .map(|(&s, &p)| if s.to_f64() == label { T::from_f64(p) } else { s })
        .collect();
    T::wrap(values)
}

fn relabel_voxels(segmentation: &VoxelData, parcellation: &[f64], label: f64) -> VoxelData {
    match segmentation {
        VoxelData::U8(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::I8(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::U16(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::I16(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::U32(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::I32(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::U64(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::I64(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::F32(v) => relabel(v.as_slice(), parcellation, label),
        VoxelData::F64(v) => relabel(v.as_slice(), parcellation, label),
    }
}

/// Leaves at or below `node` that have a sub-parcellation with data, in
/// depth-first order.
fn collect_parcellations<'v, T, V>(
    tree: &T,
    volumes: &'v V,
    node: NodeId,
    found: &mut Vec<(NodeId, i32, &'v Volume)>,
) -> Result<()>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    match tree.require_node(node)?.as_leaf() {
        Some(leaf) => {
            if let Some(parcellation) = volumes.volume_with_data(VolumeRole::SubParcellation(node)) {
                found.push((node, leaf.label, parcellation));
            }
        }
        None => {
            for child in tree.children(node)? {
                collect_parcellations(tree, volumes, child, found)?;
            }
        }
    }
    Ok(())
}

/// Split leaf labels of `segmentation` into their sub-parcels.
///
/// For every leaf at or below `node` with a sub-parcellation volume, the
/// voxels carrying the leaf's label take the parcellation's value, cast to
/// the segmentation's scalar type; voxels outside the parcellation become
/// 0. Other voxels keep their label.
///
/// All parcellations are checked against the label map before any voxel
/// changes, so an error leaves `segmentation` as it was.
pub fn sub_parcellate<T, V>(tree: &T, volumes: &V, segmentation: &mut Volume, node: NodeId) -> Result<()>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    let mut parcellations = Vec::new();
    collect_parcellations(tree, volumes, node, &mut parcellations)?;
    if parcellations.is_empty() {
        return Ok(());
    }

    let mut labels = segmentation.require_data()?.clone();
    for &(_, _, parcellation) in &parcellations {
        if parcellation.dimensions() != segmentation.dimensions() {
            return Err(CoreError::ShapeMismatch {
                expected: segmentation.dimensions().to_vec(),
                actual: parcellation.dimensions().to_vec(),
            }
            .into());
        }
    }

    for (leaf, label, parcellation) in parcellations {
        info!(
            "Sub-parcellating class {} (label {}) with '{}'",
            leaf,
            label,
            parcellation.name()
        );
        let parcels = parcellation.require_data()?.to_f64_vec();
        labels = relabel_voxels(&labels, &parcels, f64::from(label));
    }
    segmentation.set_data(labels)?;
    Ok(())
}
