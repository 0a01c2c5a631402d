//! Access to the class tree and to the volumes it references.
//!
//! The compiler and correctors only talk to these traits, so callers can
//! back them with their own scene model. [`ClassTree`] and [`VolumeStore`]
//! are the in-memory implementations.

use std::collections::{HashMap, HashSet};

use emseg_core::Volume;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::tree::{ClassNode, ClassTree, NodeId, NodeType};

/// Read and write access to class nodes by ID.
pub trait TreeRepository {
    fn node(&self, id: NodeId) -> Option<&ClassNode>;

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ClassNode>;

    fn require_node(&self, id: NodeId) -> Result<&ClassNode> {
        self.node(id).ok_or(SegmentError::UnknownNode(id))
    }

    fn require_node_mut(&mut self, id: NodeId) -> Result<&mut ClassNode> {
        self.node_mut(id).ok_or(SegmentError::UnknownNode(id))
    }

    fn node_kind(&self, id: NodeId) -> Result<NodeType> {
        Ok(self.require_node(id)?.node_type())
    }

    fn is_leaf(&self, id: NodeId) -> Result<bool> {
        Ok(self.require_node(id)?.is_leaf())
    }

    fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.require_node(id)?.children().to_vec())
    }

    fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.require_node(id)?.parent())
    }

    /// Check that `root` has no parent and that every node below it is
    /// reached once, through a parent that the node agrees with.
    fn validate(&self, root: NodeId) -> Result<()> {
        if let Some(parent) = self.parent(root)? {
            return Err(SegmentError::malformed_tree(format!(
                "node {} is not a root, its parent is {}",
                root, parent
            )));
        }
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(SegmentError::malformed_tree(format!("node {} reached twice", id)));
            }
            for child in self.children(id)? {
                if self.parent(child)? != Some(id) {
                    return Err(SegmentError::malformed_tree(format!(
                        "node {} lists {} as child but is not its parent",
                        id, child
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

impl TreeRepository for ClassTree {
    fn node(&self, id: NodeId) -> Option<&ClassNode> {
        self.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ClassNode> {
        self.get_mut(id)
    }

    /// The arena check, plus `root` must be the tree's root.
    fn validate(&self, root: NodeId) -> Result<()> {
        if self.root() != Some(root) {
            return Err(SegmentError::malformed_tree(format!(
                "node {} is not the root of the tree",
                root
            )));
        }
        ClassTree::validate(self)
    }
}

/// Logical role of a volume in the segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeRole {
    /// Selected target channel, in selection order.
    TargetChannel(usize),
    /// Atlas volume aligned to the target for a class.
    AlignedAtlas(NodeId),
    /// Spatial prior of a class, aligned to the target.
    SpatialPrior(NodeId),
    /// Sub-parcellation of a leaf class, aligned to the target.
    SubParcellation(NodeId),
}

/// Volume lookup by role.
pub trait VolumeRepository {
    fn volume(&self, role: VolumeRole) -> Option<&Volume>;

    /// Volume for `role` that also carries voxel data.
    fn volume_with_data(&self, role: VolumeRole) -> Option<&Volume> {
        self.volume(role).filter(|v| v.data().is_some())
    }

    /// Target channels `0..` up to the first missing index.
    fn target_channels(&self) -> Vec<&Volume> {
        (0..)
            .map_while(|i| self.volume(VolumeRole::TargetChannel(i)))
            .collect()
    }
}

/// In-memory [`VolumeRepository`].
#[derive(Debug, Clone, Default)]
pub struct VolumeStore {
    volumes: HashMap<VolumeRole, Volume>,
}

impl VolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `volume` under `role`, returning the volume it replaces.
    pub fn insert(&mut self, role: VolumeRole, volume: Volume) -> Option<Volume> {
        self.volumes.insert(role, volume)
    }

    pub fn remove(&mut self, role: VolumeRole) -> Option<Volume> {
        self.volumes.remove(&role)
    }

    pub fn get_mut(&mut self, role: VolumeRole) -> Option<&mut Volume> {
        self.volumes.get_mut(&role)
    }

    /// Builder form of [`VolumeStore::insert`].
    pub fn with(mut self, role: VolumeRole, volume: Volume) -> Self {
        self.insert(role, volume);
        self
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl VolumeRepository for VolumeStore {
    fn volume(&self, role: VolumeRole) -> Option<&Volume> {
        self.volumes.get(&role)
    }
}
