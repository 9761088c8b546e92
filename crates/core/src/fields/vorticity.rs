//! Relative vorticity from wind-component grids
//!
//! Second- and fourth-order central-difference stencils over interior cells;
//! boundary cells are left at zero. The east-west spacing varies per row
//! (it shrinks with the cosine of latitude), the south-north spacing is a
//! constant; both span two cells and are signed by axis direction, so the
//! central differences come out in geographic orientation whichever way the
//! latitude rows run.
//!
//! The row-parallel implementations are the production path. Plain
//! nested-loop reference implementations of the same stencils are kept and
//! can be compared against the parallel path via
//! [`VorticityConfig::cross_check`]; a disagreement beyond the tolerance is
//! a fatal consistency error. The check doubles the computation cost, so it
//! is off by default.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core_types::grid::{GridSpacing, ScalarGrid};
use crate::error::TrackError;

/// Configuration for vorticity computation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VorticityConfig {
    /// Recompute both stencils with the reference implementation and fail on
    /// disagreement beyond `tolerance`
    pub cross_check: bool,
    /// Maximum tolerated absolute cell-wise difference for the cross-check
    pub tolerance: f64,
}

impl Default for VorticityConfig {
    fn default() -> Self {
        Self {
            cross_check: false,
            tolerance: 1e-10,
        }
    }
}

fn assert_shapes(u: &ScalarGrid, v: &ScalarGrid, spacing: &GridSpacing) {
    assert_eq!(u.rows(), v.rows(), "Wind component shapes must match");
    assert_eq!(u.cols(), v.cols(), "Wind component shapes must match");
    assert_eq!(
        spacing.dx.len(),
        u.rows(),
        "Per-row spacing must cover every row"
    );
}

/// Second-order vorticity, parallel over rows
///
/// `vort[i,j] = (v[i,j+1] - v[i,j-1]) / dx[i] - (u[i+1,j] - u[i-1,j]) / dy`
/// for interior cells.
///
/// # Panics
///
/// Panics if the component shapes or the spacing length disagree.
#[must_use]
pub fn vorticity_2nd(u: &ScalarGrid, v: &ScalarGrid, spacing: &GridSpacing) -> ScalarGrid {
    assert_shapes(u, v, spacing);
    let rows = u.rows();
    let cols = u.cols();
    let mut vort = ScalarGrid::zeros(rows, cols);

    vort.as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(i, out_row)| {
            if i == 0 || i == rows - 1 {
                return;
            }
            let dx = spacing.dx[i];
            for j in 1..cols - 1 {
                let dv_dx = (v.get(i, j + 1) - v.get(i, j - 1)) / dx;
                let du_dy = (u.get(i + 1, j) - u.get(i - 1, j)) / spacing.dy;
                out_row[j] = dv_dx - du_dy;
            }
        });

    vort
}

/// Fourth-order vorticity (Walsh's five-point combination), parallel over rows
///
/// # Panics
///
/// Panics if the component shapes or the spacing length disagree.
#[must_use]
pub fn vorticity_4th(u: &ScalarGrid, v: &ScalarGrid, spacing: &GridSpacing) -> ScalarGrid {
    assert_shapes(u, v, spacing);
    let rows = u.rows();
    let cols = u.cols();
    let mut vort = ScalarGrid::zeros(rows, cols);

    vort.as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(i, out_row)| {
            if i < 2 || i >= rows - 2 {
                return;
            }
            let dx = spacing.dx[i];
            for j in 2..cols - 2 {
                let du_dy = 2.0 / 3.0 * (u.get(i + 1, j) - u.get(i - 1, j)) / spacing.dy
                    - (u.get(i + 2, j) - u.get(i - 2, j)) / (12.0 * spacing.dy);
                let dv_dx = 2.0 / 3.0 * (v.get(i, j + 1) - v.get(i, j - 1)) / dx
                    - (v.get(i, j + 2) - v.get(i, j - 2)) / (12.0 * dx);
                out_row[j] = dv_dx - du_dy;
            }
        });

    vort
}

/// Straightforward sequential second-order stencil, kept as the cross-check
/// reference
fn vorticity_2nd_reference(u: &ScalarGrid, v: &ScalarGrid, spacing: &GridSpacing) -> ScalarGrid {
    let rows = u.rows();
    let cols = u.cols();
    let mut vort = ScalarGrid::zeros(rows, cols);
    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            let dv_dx = (v.get(i, j + 1) - v.get(i, j - 1)) / spacing.dx[i];
            let du_dy = (u.get(i + 1, j) - u.get(i - 1, j)) / spacing.dy;
            vort.set(i, j, dv_dx - du_dy);
        }
    }
    vort
}

/// Straightforward sequential fourth-order stencil, kept as the cross-check
/// reference
fn vorticity_4th_reference(u: &ScalarGrid, v: &ScalarGrid, spacing: &GridSpacing) -> ScalarGrid {
    let rows = u.rows();
    let cols = u.cols();
    let mut vort = ScalarGrid::zeros(rows, cols);
    for i in 2..rows - 2 {
        for j in 2..cols - 2 {
            let du_dy = 2.0 / 3.0 * (u.get(i + 1, j) - u.get(i - 1, j)) / spacing.dy
                - (u.get(i + 2, j) - u.get(i - 2, j)) / (12.0 * spacing.dy);
            let dv_dx = 2.0 / 3.0 * (v.get(i, j + 1) - v.get(i, j - 1)) / spacing.dx[i]
                - (v.get(i, j + 2) - v.get(i, j - 2)) / (12.0 * spacing.dx[i]);
            vort.set(i, j, dv_dx - du_dy);
        }
    }
    vort
}

/// Compute the production (second-order) vorticity field
///
/// With [`VorticityConfig::cross_check`] enabled, both stencil orders are
/// recomputed with the sequential reference implementation and compared
/// against the parallel path.
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] when a cross-check difference exceeds
/// the configured tolerance.
pub fn compute_vorticity(
    u: &ScalarGrid,
    v: &ScalarGrid,
    spacing: &GridSpacing,
    config: &VorticityConfig,
) -> Result<ScalarGrid, TrackError> {
    let vort = vorticity_2nd(u, v, spacing);

    if config.cross_check {
        let diff2 = vort.max_abs_diff(&vorticity_2nd_reference(u, v, spacing));
        if diff2 > config.tolerance {
            return Err(TrackError::Consistency(format!(
                "Second-order vorticity cross-check differs by {diff2:e} (tolerance {:e})",
                config.tolerance
            )));
        }
        let vort4 = vorticity_4th(u, v, spacing);
        let diff4 = vort4.max_abs_diff(&vorticity_4th_reference(u, v, spacing));
        if diff4 > config.tolerance {
            return Err(TrackError::Consistency(format!(
                "Fourth-order vorticity cross-check differs by {diff4:e} (tolerance {:e})",
                config.tolerance
            )));
        }
    }

    Ok(vort)
}
