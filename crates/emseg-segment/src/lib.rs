//! Tissue class tree and its compilation for the EM/MFA segmentation engine.

pub mod autocorrect;
pub mod boundary;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod parcellation;
pub mod preprocess;
pub mod repository;
pub mod solver;
pub mod tree;

pub use autocorrect::auto_correct_spatial_prior_weight;
pub use boundary::{correct_node_boundary, define_valid_segmentation_boundary, validate_boundary, BoundaryCheck};
pub use compiler::{compile, resize_channels, Compilation};
pub use config::{CompileOptions, GlobalParameters};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{Result, SegmentError};
pub use parcellation::sub_parcellate;
pub use preprocess::resample_and_cast_to_target;
pub use repository::{TreeRepository, VolumeRepository, VolumeRole, VolumeStore};
pub use solver::{
    map_interpolation, map_stopping_condition, SolverClass, SolverClassKind, SolverConfig, SolverGlobals,
    SolverInterpolation, SolverLeaf, SolverStopping, SolverStoppingType, SolverSuperClass,
};
pub use tree::{
    BranchClass, BranchPrintFlags, ClassNode, ClassTree, LeafClass, NodeId, NodeKind, NodeType, StoppingCondition,
    StoppingConditionKind, NUM_MARKOV_DIRECTIONS,
};
