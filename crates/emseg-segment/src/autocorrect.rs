//! Spatial-prior weight auto-correction.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::repository::{TreeRepository, VolumeRepository, VolumeRole};
use crate::tree::NodeId;

/// Zero the spatial-prior weight of every leaf below `node` that has a
/// positive weight but no aligned spatial-prior volume with data.
///
/// Running it twice changes nothing the second time.
pub fn auto_correct_spatial_prior_weight<T, V>(
    tree: &mut T,
    volumes: &V,
    node: NodeId,
) -> Result<Diagnostics>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    let mut diagnostics = Diagnostics::new();
    if tree.is_leaf(node)? {
        correct_leaf(tree, volumes, node, &mut diagnostics)?;
    } else {
        correct_children(tree, volumes, node, &mut diagnostics)?;
    }
    Ok(diagnostics)
}

fn correct_children<T, V>(tree: &mut T, volumes: &V, node: NodeId, diagnostics: &mut Diagnostics) -> Result<()>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    for child in tree.children(node)? {
        if tree.is_leaf(child)? {
            correct_leaf(tree, volumes, child, diagnostics)?;
        } else {
            correct_children(tree, volumes, child, diagnostics)?;
        }
    }
    Ok(())
}

fn correct_leaf<T, V>(tree: &mut T, volumes: &V, leaf: NodeId, diagnostics: &mut Diagnostics) -> Result<()>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    let has_prior = volumes.volume_with_data(VolumeRole::SpatialPrior(leaf)).is_some();
    let class = tree.require_node_mut(leaf)?;
    if class.spatial_prior_weight > 0.0 && !has_prior {
        diagnostics.warn(
            DiagnosticKind::SpatialPriorWeightReset,
            Some(leaf),
            format!(
                "class '{}' spatial prior weight {} set to 0, no atlas assigned to class",
                class.name, class.spatial_prior_weight
            ),
        );
        class.spatial_prior_weight = 0.0;
    }
    Ok(())
}
