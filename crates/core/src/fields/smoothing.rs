//! Optional Gaussian smoothing of detection fields
//!
//! Separable Gaussian blur applied before extrema detection when configured.
//! Edges are handled by clamping to the nearest cell, matching the
//! nearest-neighbour edge mode of the upstream processing chain.

use crate::core_types::grid::ScalarGrid;

fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Smooth a grid with a Gaussian of the given standard deviation (in cells)
///
/// # Panics
///
/// Panics if `sigma` is not positive.
#[must_use]
pub fn gaussian_smooth(grid: &ScalarGrid, sigma: f64) -> ScalarGrid {
    assert!(sigma > 0.0, "Smoothing sigma must be positive");
    let weights = kernel(sigma);
    let radius = (weights.len() / 2) as isize;
    let rows = grid.rows() as isize;
    let cols = grid.cols() as isize;

    // Horizontal pass, then vertical, both clamped at the edges.
    let horizontal = ScalarGrid::from_fn(grid.rows(), grid.cols(), |i, j| {
        weights
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let jj = (j as isize + k as isize - radius).clamp(0, cols - 1) as usize;
                w * grid.get(i, jj)
            })
            .sum()
    });
    ScalarGrid::from_fn(grid.rows(), grid.cols(), |i, j| {
        weights
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let ii = (i as isize + k as isize - radius).clamp(0, rows - 1) as usize;
                w * horizontal.get(ii, j)
            })
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::extrema::{find_extrema, GridPoint};
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_field_unchanged() {
        let grid = ScalarGrid::from_fn(6, 7, |_, _| 3.5);
        let smoothed = gaussian_smooth(&grid, 1.0);
        for i in 0..6 {
            for j in 0..7 {
                assert_relative_eq!(smoothed.get(i, j), 3.5, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_smoothing_spreads_and_conserves_peak_location() {
        let mut grid = ScalarGrid::zeros(11, 11);
        grid.set(5, 5, 100.0);
        let smoothed = gaussian_smooth(&grid, 1.0);

        assert!(smoothed.get(5, 5) < 100.0, "peak must flatten");
        assert!(smoothed.get(5, 6) > 0.0, "mass must spread");
        let set = find_extrema(&smoothed);
        assert!(
            set.maxima.contains(&GridPoint { row: 5, col: 5 }),
            "dominant extremum must survive smoothing: {:?}",
            set.maxima
        );
    }
}
