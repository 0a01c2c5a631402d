//! Target-channel preprocessing ahead of the EM run.

use burn::tensor::backend::Backend;
use emseg_core::filter::{cast_volume, estimate_background, reslice_affine};
use emseg_core::{geometries_equal, InterpolationMode, Volume};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;

/// Bring a target channel onto the reference channel's grid and type.
///
/// Used when target-to-target registration is skipped. If `output` is not
/// on `fixed`'s grid, `moving` is linearly resliced into it with `fixed` as
/// the geometry reference and the moving background as fill value. If the
/// channels differ in scalar type, `output` is then cast to `fixed`'s type.
pub fn resample_and_cast_to_target<B: Backend>(
    moving: &Volume,
    fixed: &Volume,
    output: &mut Volume,
    device: &B::Device,
) -> Result<Diagnostics> {
    let fixed_type = fixed.require_data()?.scalar_type();
    let moving_type = moving.require_data()?.scalar_type();
    let mut diagnostics = Diagnostics::new();

    if !geometries_equal(fixed, output) {
        diagnostics.warn(
            DiagnosticKind::GeometryMismatch,
            None,
            format!(
                "'{}' is not on the grid of '{}', resampling\n{}:\n{}\n{}:\n{}",
                output.name(),
                fixed.name(),
                fixed.name(),
                fixed.geometry(),
                output.name(),
                output.geometry()
            ),
        );
        let background = estimate_background(moving)?;
        reslice_affine::<B>(
            moving,
            output,
            Some(fixed.geometry()),
            None,
            InterpolationMode::Linear,
            background,
            device,
        )?;
    }

    if fixed_type != moving_type {
        cast_volume(output, fixed_type)?;
    }

    Ok(diagnostics)
}
