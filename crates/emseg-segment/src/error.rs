//! Error types for class-tree compilation.
//!
//! Structural problems that are tolerated (probability sums, boundaries,
//! spatial-prior weights) are reported as [`crate::Diagnostic`]s instead;
//! these errors stop the operation that raised them.

use emseg_core::CoreError;
use thiserror::Error;

use crate::tree::NodeId;

/// Main error type for segmentation setup.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// A node ID that the tree does not contain.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The tree shape breaks an invariant (no root, leaf with children, ...).
    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    /// An enumeration value with no counterpart in the solver.
    #[error("Unmapped value: {0}")]
    UnmappedValue(String),

    /// A required volume or voxel buffer is absent.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Error raised by a volume operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for segmentation setup.
pub type Result<T> = std::result::Result<T, SegmentError>;

impl SegmentError {
    /// Create a malformed tree error.
    pub fn malformed_tree(msg: impl Into<String>) -> Self {
        Self::MalformedTree(msg.into())
    }

    /// Create an unmapped value error.
    pub fn unmapped(msg: impl Into<String>) -> Self {
        Self::UnmappedValue(msg.into())
    }

    /// Create a missing data error.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }
}
