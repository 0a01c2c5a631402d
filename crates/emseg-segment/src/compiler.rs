//! Class tree to solver configuration.
//!
//! One depth-first pass over the tree. Each node's segmentation boundary
//! is checked against the first target channel and corrected in place;
//! everything else is read and copied into a fresh [`SolverConfig`], so a
//! failed compile leaves no half-built configuration behind.

use std::collections::HashSet;

use emseg_core::Volume;
use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::boundary::correct_node_boundary;
use crate::config::{CompileOptions, GlobalParameters};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, SegmentError};
use crate::repository::{TreeRepository, VolumeRepository, VolumeRole};
use crate::solver::{
    map_interpolation, SolverClass, SolverClassKind, SolverConfig, SolverGlobals, SolverLeaf,
    SolverStopping, SolverSuperClass,
};
use crate::tree::{NodeId, NodeKind, NUM_MARKOV_DIRECTIONS};

/// Output of [`compile`].
#[derive(Debug, Clone)]
pub struct Compilation<'a> {
    pub config: SolverConfig<'a>,
    /// Warnings raised while compiling, in traversal order.
    pub diagnostics: Diagnostics,
}

struct CompileContext<'a, 'o, V: ?Sized> {
    volumes: &'a V,
    dims: [usize; 3],
    channels: usize,
    options: &'o CompileOptions,
    visited: HashSet<NodeId>,
    diagnostics: Diagnostics,
}

/// Compile the subtree at `root` into the solver's configuration.
///
/// `root` must be the root of a well-formed tree and a branch. Its
/// smoothing kernel becomes the engine-wide smoothing kernel, the sigma
/// rounded to an integer.
pub fn compile<'a, T, V>(
    tree: &mut T,
    root: NodeId,
    volumes: &'a V,
    globals: &GlobalParameters,
    options: &CompileOptions,
) -> Result<Compilation<'a>>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    let channels: Vec<&'a Volume> = volumes.target_channels();
    let reference = channels
        .first()
        .ok_or_else(|| SegmentError::missing_data("no target channel selected"))?;
    for channel in &channels {
        channel.require_data()?;
    }
    let registration_interpolation = map_interpolation(globals.registration_interpolation)?;
    tree.validate(root)?;

    let root_branch = tree.require_node(root)?.as_branch().ok_or_else(|| {
        SegmentError::malformed_tree(format!("root class {} must have children", root))
    })?;
    let smoothing_kernel_width = root_branch.smoothing_kernel_width;
    let smoothing_kernel_sigma = root_branch.smoothing_kernel_sigma.round() as i32;

    info!(
        "Compiling class tree at node {} for {} target channel(s)",
        root,
        channels.len()
    );

    if options.resize_channels {
        resize_channels(tree, root, channels.len())?;
    }

    let mut ctx = CompileContext {
        volumes,
        dims: reference.dimensions(),
        channels: channels.len(),
        options,
        visited: HashSet::new(),
        diagnostics: Diagnostics::new(),
    };
    let head = compile_class(tree, root, &mut ctx)?;

    info!(
        "Compiled {} classes with {} warning(s)",
        head.num_classes(),
        ctx.diagnostics.len()
    );

    Ok(Compilation {
        config: SolverConfig {
            head,
            input_channels: channels,
            globals: SolverGlobals {
                disable_multithreading: !globals.enable_multithreading,
                print_dir: globals.print_dir.clone(),
                smoothing_kernel_width,
                smoothing_kernel_sigma,
                registration_interpolation,
            },
            number_of_training_samples: globals.atlas_training_samples,
        },
        diagnostics: ctx.diagnostics,
    })
}

/// Resize channel weights, leaf means and leaf covariances below `root`.
///
/// New weights are 1.0, new mean and covariance entries 0.0.
pub fn resize_channels<T>(tree: &mut T, root: NodeId, channels: usize) -> Result<()>
where
    T: TreeRepository + ?Sized,
{
    let mut stack = vec![root];
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            return Err(SegmentError::malformed_tree(format!("node {} reached twice", id)));
        }
        let node = tree.require_node_mut(id)?;
        node.channel_weights.resize(channels, 1.0);
        if let Some(leaf) = node.as_leaf_mut() {
            leaf.log_mean.resize_vertically_mut(channels, 0.0);
            leaf.log_covariance.resize_mut(channels, channels, 0.0);
        }
        stack.extend(node.children().iter().copied());
    }
    Ok(())
}

fn compile_class<'a, T, V>(
    tree: &mut T,
    id: NodeId,
    ctx: &mut CompileContext<'a, '_, V>,
) -> Result<SolverClass<'a>>
where
    T: TreeRepository + ?Sized,
    V: VolumeRepository + ?Sized,
{
    if !ctx.visited.insert(id) {
        return Err(SegmentError::malformed_tree(format!("node {} reached twice", id)));
    }

    let boundary = correct_node_boundary(tree, id, ctx.dims, &mut ctx.diagnostics)?;
    let node = tree.require_node(id)?.clone();
    debug!("Compiling class '{}' ({})", node.name, id);

    if node.channel_weights.len() != ctx.channels {
        return Err(SegmentError::malformed_tree(format!(
            "class '{}' has {} channel weights for {} channels",
            node.name,
            node.channel_weights.len(),
            ctx.channels
        )));
    }

    let kind = match node.kind {
        NodeKind::Leaf(leaf) => {
            let n = ctx.channels;
            if leaf.log_mean.len() != n || leaf.log_covariance.shape() != (n, n) {
                return Err(SegmentError::malformed_tree(format!(
                    "class '{}' distribution does not have {} channels",
                    node.name, n
                )));
            }
            SolverClassKind::Leaf(SolverLeaf {
                label: leaf.label,
                log_mu: leaf.log_mean,
                log_covariance: leaf.log_covariance,
                print_quality: leaf.print_quality,
            })
        }
        NodeKind::Branch(branch) => {
            let mut children = Vec::with_capacity(branch.children.len());
            for &child in &branch.children {
                children.push(compile_class(tree, child, ctx)?);
            }

            let sum: f64 = children.iter().map(|c| c.tissue_probability).sum();
            if (sum - 1.0).abs() > ctx.options.probability_tolerance {
                ctx.diagnostics.warn(
                    DiagnosticKind::ProbabilitySumMismatch,
                    Some(id),
                    format!(
                        "class probabilities of the children of '{}' sum to {} instead of 1",
                        node.name, sum
                    ),
                );
            }

            let n = children.len();
            SolverClassKind::Super(SolverSuperClass {
                markov_matrices: vec![DMatrix::identity(n, n); NUM_MARKOV_DIRECTIONS],
                children,
                stop_em: SolverStopping::from(&branch.stop_em),
                stop_mfa: SolverStopping::from(&branch.stop_mfa),
                stop_bias_calculation: branch.bias_calculation_max_iterations,
                generate_background_probability: branch.generate_background_probability,
                alpha: branch.alpha,
                print: branch.print,
            })
        }
    };

    Ok(SolverClass {
        node: id,
        name: node.name,
        segmentation_boundary_min: boundary.min,
        segmentation_boundary_max: boundary.max,
        prob_data_weight: node.spatial_prior_weight,
        tissue_probability: node.class_probability,
        print_weights: node.print_weights,
        input_channel_weights: node.channel_weights,
        exclude_from_incomplete_e_step: node.exclude_from_incomplete_e_step,
        prob_data: ctx.volumes.volume_with_data(VolumeRole::SpatialPrior(id)),
        kind,
    })
}
