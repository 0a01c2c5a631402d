//! Transform types and operations.
//!
//! Point mappings used by the resampler: homogeneous matrices, dense
//! displacement fields and their composition.

pub mod chained;
pub mod displacement_field;
pub mod matrix;
pub mod trait_;

pub use chained::ChainedTransform;
pub use displacement_field::{compose_displacement_field, DisplacementField, GridDisplacement};
pub use matrix::MatrixTransform;
pub use trait_::Transform;
