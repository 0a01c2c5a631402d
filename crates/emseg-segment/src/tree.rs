//! Tissue class tree.
//!
//! Nodes live in an arena keyed by [`NodeId`]; parents and children refer
//! to each other by ID only. Branch and leaf classes share the fields of
//! [`ClassNode`] and differ in [`NodeKind`].

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};

/// Number of neighbour directions with a Markov matrix (±x, ±y, ±z).
pub const NUM_MARKOV_DIRECTIONS: usize = 6;

/// Stable identifier of a node in a [`ClassTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Criterion ending an EM or MFA loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoppingConditionKind {
    /// Run a fixed number of iterations.
    #[default]
    Iterations,
    /// Stop when the label map stops changing.
    LabelMapMeasure,
    /// Stop when the class weights stop changing.
    WeightsMeasure,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoppingCondition {
    pub kind: StoppingConditionKind,
    /// Convergence threshold for the measure kinds.
    pub value: f64,
    pub max_iterations: u32,
}

impl Default for StoppingCondition {
    fn default() -> Self {
        Self {
            kind: StoppingConditionKind::Iterations,
            value: 0.0,
            max_iterations: 1,
        }
    }
}

impl StoppingCondition {
    pub fn new(kind: StoppingConditionKind, value: f64, max_iterations: u32) -> Self {
        Self {
            kind,
            value,
            max_iterations,
        }
    }
}

/// Diagnostic output switches of a branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchPrintFlags {
    /// Print every n-th iteration, 0 disables.
    pub frequency: i32,
    pub bias: bool,
    pub label_map: bool,
    pub em_label_map_convergence: bool,
    pub em_weights_convergence: bool,
    pub mfa_label_map_convergence: bool,
    pub mfa_weights_convergence: bool,
}

/// Terminal, statistically modelled tissue class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafClass {
    /// Intensity written for this class in the label map.
    pub label: i32,
    /// Mean of the log intensities, one entry per channel.
    pub log_mean: DVector<f64>,
    /// Covariance of the log intensities, channels x channels.
    pub log_covariance: DMatrix<f64>,
    pub print_quality: bool,
}

/// Super-class grouping child classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchClass {
    pub children: Vec<NodeId>,
    /// Label transition weights, one children x children matrix per direction.
    pub markov_matrices: Vec<DMatrix<f64>>,
    pub stop_em: StoppingCondition,
    pub stop_mfa: StoppingCondition,
    pub bias_calculation_max_iterations: i32,
    pub generate_background_probability: bool,
    /// Weight of the MFA neighbourhood term.
    pub alpha: f64,
    pub smoothing_kernel_width: i32,
    pub smoothing_kernel_sigma: f64,
    pub print: BranchPrintFlags,
}

impl Default for BranchClass {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            markov_matrices: vec![DMatrix::zeros(0, 0); NUM_MARKOV_DIRECTIONS],
            stop_em: StoppingCondition::default(),
            stop_mfa: StoppingCondition::default(),
            bias_calculation_max_iterations: -1,
            generate_background_probability: false,
            alpha: 0.7,
            smoothing_kernel_width: 11,
            smoothing_kernel_sigma: 5.0,
            print: BranchPrintFlags::default(),
        }
    }
}

/// Variant-specific data of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Leaf(LeafClass),
    Branch(BranchClass),
}

/// Discriminant of [`NodeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Leaf,
    Branch,
}

/// A class in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    id: NodeId,
    parent: Option<NodeId>,
    pub name: String,
    /// Prior weight of this class among its siblings.
    pub class_probability: f64,
    /// Weight of the atlas spatial prior, 0 disables it.
    pub spatial_prior_weight: f64,
    /// One weight per selected target channel.
    pub channel_weights: Vec<f64>,
    /// Region of interest, 1-based inclusive.
    pub boundary_min: [i32; 3],
    pub boundary_max: [i32; 3],
    pub exclude_from_incomplete_e_step: bool,
    pub print_weights: bool,
    pub kind: NodeKind,
}

impl ClassNode {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId(0),
            parent: None,
            name: name.into(),
            class_probability: 0.0,
            spatial_prior_weight: 0.0,
            channel_weights: Vec::new(),
            boundary_min: [0; 3],
            boundary_max: [0; 3],
            exclude_from_incomplete_e_step: false,
            print_weights: false,
            kind,
        }
    }

    /// New leaf class with an empty (zero channel) distribution.
    pub fn leaf(name: impl Into<String>, label: i32) -> Self {
        Self::with_kind(
            name,
            NodeKind::Leaf(LeafClass {
                label,
                log_mean: DVector::zeros(0),
                log_covariance: DMatrix::zeros(0, 0),
                print_quality: false,
            }),
        )
    }

    /// New branch class without children.
    pub fn branch(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Branch(BranchClass::default()))
    }

    pub fn with_class_probability(mut self, probability: f64) -> Self {
        self.class_probability = probability;
        self
    }

    pub fn with_spatial_prior_weight(mut self, weight: f64) -> Self {
        self.spatial_prior_weight = weight;
        self
    }

    pub fn with_boundary(mut self, min: [i32; 3], max: [i32; 3]) -> Self {
        self.boundary_min = min;
        self.boundary_max = max;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Leaf(_) => NodeType::Leaf,
            NodeKind::Branch(_) => NodeType::Branch,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafClass> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Branch(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafClass> {
        match &mut self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchClass> {
        match &self.kind {
            NodeKind::Branch(branch) => Some(branch),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut BranchClass> {
        match &mut self.kind {
            NodeKind::Branch(branch) => Some(branch),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Child IDs in order; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        self.as_branch().map(|b| b.children.as_slice()).unwrap_or(&[])
    }
}

/// Arena of class nodes with a single root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassTree {
    nodes: BTreeMap<NodeId, ClassNode>,
    root: Option<NodeId>,
    next_id: u64,
}

impl ClassTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&ClassNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ClassNode> {
        self.nodes.get_mut(&id)
    }

    /// Lookup that reports unknown IDs as an error.
    pub fn require(&self, id: NodeId) -> Result<&ClassNode> {
        self.get(id).ok_or(SegmentError::UnknownNode(id))
    }

    pub fn require_mut(&mut self, id: NodeId) -> Result<&mut ClassNode> {
        self.get_mut(id).ok_or(SegmentError::UnknownNode(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassNode> {
        self.nodes.values()
    }

    fn insert(&mut self, mut node: ClassNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        node.parent = parent;
        self.nodes.insert(id, node);
        id
    }

    /// Install the root class.
    pub fn set_root(&mut self, node: ClassNode) -> Result<NodeId> {
        if let Some(root) = self.root {
            return Err(SegmentError::malformed_tree(format!(
                "tree already has root {}",
                root
            )));
        }
        let id = self.insert(node, None);
        self.root = Some(id);
        Ok(id)
    }

    /// Append `node` as the last child of `parent`, which must be a branch.
    pub fn add_child(&mut self, parent: NodeId, node: ClassNode) -> Result<NodeId> {
        let parent_node = self.require(parent)?;
        if parent_node.is_leaf() {
            return Err(SegmentError::malformed_tree(format!(
                "cannot add a child to leaf '{}'",
                parent_node.name
            )));
        }
        let id = self.insert(node, Some(parent));
        if let Some(branch) = self.require_mut(parent)?.as_branch_mut() {
            branch.children.push(id);
        }
        Ok(id)
    }

    /// IDs of `start` and its descendants in depth-first pre-order.
    pub fn depth_first(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = self.require(id)?;
            if order.len() > self.nodes.len() {
                return Err(SegmentError::malformed_tree("cycle in class tree"));
            }
            order.push(id);
            stack.extend(node.children().iter().rev().copied());
        }
        Ok(order)
    }

    /// Check the arena's structural invariants.
    ///
    /// Every node must be reachable from the root exactly once and agree
    /// with its parent about the parent link.
    pub fn validate(&self) -> Result<()> {
        let root = self
            .root
            .ok_or_else(|| SegmentError::malformed_tree("tree has no root"))?;
        let order = self.depth_first(root)?;
        if order.len() != self.nodes.len() {
            return Err(SegmentError::malformed_tree(format!(
                "{} of {} nodes reachable from the root",
                order.len(),
                self.nodes.len()
            )));
        }
        for id in order {
            for &child in self.require(id)?.children() {
                if self.require(child)?.parent != Some(id) {
                    return Err(SegmentError::malformed_tree(format!(
                        "node {} lists {} as child but is not its parent",
                        id, child
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (ClassTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = ClassTree::new();
        let root = tree.set_root(ClassNode::branch("root")).unwrap();
        let bg = tree.add_child(root, ClassNode::leaf("background", 0)).unwrap();
        let brain = tree.add_child(root, ClassNode::branch("brain")).unwrap();
        let wm = tree.add_child(brain, ClassNode::leaf("white matter", 5)).unwrap();
        (tree, root, bg, brain, wm)
    }

    #[test]
    fn test_tree_links() {
        let (tree, root, bg, brain, wm) = small_tree();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.get(root).unwrap().children(), &[bg, brain]);
        assert_eq!(tree.get(wm).unwrap().parent(), Some(brain));
        assert_eq!(tree.get(bg).unwrap().node_type(), NodeType::Leaf);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_depth_first_order() {
        let (tree, root, bg, brain, wm) = small_tree();
        assert_eq!(tree.depth_first(root).unwrap(), vec![root, bg, brain, wm]);
    }

    #[test]
    fn test_leaf_cannot_have_children() {
        let (mut tree, _, bg, _, _) = small_tree();
        let err = tree.add_child(bg, ClassNode::leaf("x", 1)).unwrap_err();
        assert!(matches!(err, SegmentError::MalformedTree(_)));
    }

    #[test]
    fn test_second_root_is_rejected() {
        let (mut tree, _, _, _, _) = small_tree();
        assert!(tree.set_root(ClassNode::branch("other")).is_err());
    }

    #[test]
    fn test_unknown_node() {
        let (tree, _, _, _, _) = small_tree();
        assert!(matches!(tree.require(NodeId(99)), Err(SegmentError::UnknownNode(NodeId(99)))));
    }

    #[test]
    fn test_validate_requires_root() {
        assert!(ClassTree::new().validate().is_err());
    }
}
