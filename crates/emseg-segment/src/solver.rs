//! Flattened configuration handed to the EM/MFA engine.
//!
//! The engine has its own enumerations for interpolation and stopping
//! conditions; the tree's values reach it only through the exhaustive
//! mapping functions below, so a value without a counterpart is an error
//! instead of a silent default.

use std::path::PathBuf;

use emseg_core::{InterpolationMode, Volume};
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SegmentError};
use crate::tree::{BranchPrintFlags, NodeId, StoppingCondition, StoppingConditionKind};

/// Interpolation types understood by the engine's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverInterpolation {
    Linear,
    Neighbour,
}

/// Stopping criteria understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStoppingType {
    Fixed,
    LabelMap,
    Weights,
}

/// Translate a registration interpolation mode.
///
/// Cubic interpolation has no engine counterpart and is rejected.
pub fn map_interpolation(mode: InterpolationMode) -> Result<SolverInterpolation> {
    match mode {
        InterpolationMode::Linear => Ok(SolverInterpolation::Linear),
        InterpolationMode::NearestNeighbor => Ok(SolverInterpolation::Neighbour),
        InterpolationMode::Cubic => Err(SegmentError::unmapped(format!(
            "registration interpolation '{}' is not supported by the solver",
            mode
        ))),
    }
}

pub fn map_stopping_condition(kind: StoppingConditionKind) -> SolverStoppingType {
    match kind {
        StoppingConditionKind::Iterations => SolverStoppingType::Fixed,
        StoppingConditionKind::LabelMapMeasure => SolverStoppingType::LabelMap,
        StoppingConditionKind::WeightsMeasure => SolverStoppingType::Weights,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverStopping {
    pub kind: SolverStoppingType,
    pub value: f64,
    pub max_iterations: u32,
}

impl From<&StoppingCondition> for SolverStopping {
    fn from(condition: &StoppingCondition) -> Self {
        Self {
            kind: map_stopping_condition(condition.kind),
            value: condition.value,
            max_iterations: condition.max_iterations,
        }
    }
}

/// Leaf-only part of a compiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverLeaf {
    pub label: i32,
    pub log_mu: DVector<f64>,
    pub log_covariance: DMatrix<f64>,
    pub print_quality: bool,
}

/// Branch-only part of a compiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSuperClass<'a> {
    pub children: Vec<SolverClass<'a>>,
    /// One children x children matrix per neighbour direction.
    pub markov_matrices: Vec<DMatrix<f64>>,
    pub stop_em: SolverStopping,
    pub stop_mfa: SolverStopping,
    pub stop_bias_calculation: i32,
    pub generate_background_probability: bool,
    pub alpha: f64,
    pub print: BranchPrintFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverClassKind<'a> {
    Leaf(SolverLeaf),
    Super(SolverSuperClass<'a>),
}

/// A compiled class, mirroring one tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverClass<'a> {
    /// Tree node this class was compiled from.
    pub node: NodeId,
    pub name: String,
    pub segmentation_boundary_min: [i32; 3],
    pub segmentation_boundary_max: [i32; 3],
    pub prob_data_weight: f64,
    pub tissue_probability: f64,
    pub print_weights: bool,
    pub input_channel_weights: Vec<f64>,
    pub exclude_from_incomplete_e_step: bool,
    /// Aligned spatial prior, when one with data is available.
    pub prob_data: Option<&'a Volume>,
    pub kind: SolverClassKind<'a>,
}

impl<'a> SolverClass<'a> {
    pub fn as_leaf(&self) -> Option<&SolverLeaf> {
        match &self.kind {
            SolverClassKind::Leaf(leaf) => Some(leaf),
            SolverClassKind::Super(_) => None,
        }
    }

    pub fn as_super(&self) -> Option<&SolverSuperClass<'a>> {
        match &self.kind {
            SolverClassKind::Super(class) => Some(class),
            SolverClassKind::Leaf(_) => None,
        }
    }

    pub fn children(&self) -> &[SolverClass<'a>] {
        match &self.kind {
            SolverClassKind::Super(class) => &class.children,
            SolverClassKind::Leaf(_) => &[],
        }
    }

    /// Find the class compiled from `node` in this subtree.
    pub fn find(&self, node: NodeId) -> Option<&SolverClass<'a>> {
        if self.node == node {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(node))
    }

    /// Number of classes in this subtree, itself included.
    pub fn num_classes(&self) -> usize {
        1 + self.children().iter().map(SolverClass::num_classes).sum::<usize>()
    }
}

/// Engine-wide parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverGlobals {
    pub disable_multithreading: bool,
    pub print_dir: Option<PathBuf>,
    pub smoothing_kernel_width: i32,
    pub smoothing_kernel_sigma: i32,
    pub registration_interpolation: SolverInterpolation,
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig<'a> {
    pub head: SolverClass<'a>,
    /// Target channels in selection order.
    pub input_channels: Vec<&'a Volume>,
    pub globals: SolverGlobals,
    pub number_of_training_samples: u32,
}

impl SolverConfig<'_> {
    pub fn num_input_images(&self) -> usize {
        self.input_channels.len()
    }
}
