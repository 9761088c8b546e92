//! Local extrema detection on scalar grids
//!
//! Every interior-row cell is compared against its full 3x3 neighbourhood.
//! Columns wrap at the array edge (longitude wraps at 360 degrees); the
//! first and last rows are skipped (no polar wraparound). A cell that is
//! simultaneously a maximum and a minimum sits in a flat region and is
//! excluded from both sets.
//!
//! The scan is exhaustive, O(rows * cols), parallelized over rows; the
//! tie semantics are exact (a neighbour strictly greater disqualifies a
//! maximum, strictly smaller disqualifies a minimum).

use rayon::prelude::*;

use crate::core_types::geo::GeoPos;
use crate::core_types::grid::{GridCoords, ScalarGrid};

/// A detected extremum as grid indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPoint {
    pub row: usize,
    pub col: usize,
}

/// Local maxima and minima of one grid, in row-major discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtremaSet {
    pub maxima: Vec<GridPoint>,
    pub minima: Vec<GridPoint>,
}

impl ExtremaSet {
    /// Attach values and geographic positions from the source grid
    #[must_use]
    pub fn valued(&self, grid: &ScalarGrid, coords: &GridCoords) -> ValuedExtrema {
        let read = |pts: &[GridPoint]| {
            pts.iter()
                .map(|p| (grid.get(p.row, p.col), coords.geo_at(p.row, p.col)))
                .collect()
        };
        ValuedExtrema {
            maxima: read(&self.maxima),
            minima: read(&self.minima),
        }
    }
}

/// Extrema with their field values and geographic positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuedExtrema {
    pub maxima: Vec<(f64, GeoPos)>,
    pub minima: Vec<(f64, GeoPos)>,
}

/// Scan a grid for local maxima and minima
#[must_use]
pub fn find_extrema(grid: &ScalarGrid) -> ExtremaSet {
    let rows = grid.rows();
    let cols = grid.cols();
    if rows < 3 {
        return ExtremaSet::default();
    }

    // Rows are independent; collect per-row results in order so discovery
    // order stays row-major regardless of scheduling.
    let per_row: Vec<(Vec<GridPoint>, Vec<GridPoint>)> = (1..rows - 1)
        .into_par_iter()
        .map(|i| {
            let mut maxima = Vec::new();
            let mut minima = Vec::new();
            for j in 0..cols {
                let val = grid.get(i, j);
                let mut is_max = true;
                let mut is_min = true;
                for ii in i - 1..=i + 1 {
                    for jj in j as isize - 1..=j as isize + 1 {
                        let neighbour = grid.get_wrapped(ii, jj);
                        if neighbour > val {
                            is_max = false;
                        }
                        if neighbour < val {
                            is_min = false;
                        }
                    }
                }
                // A cell that passes both tests sits in a flat region.
                if is_max && is_min {
                    continue;
                }
                if is_max {
                    maxima.push(GridPoint { row: i, col: j });
                } else if is_min {
                    minima.push(GridPoint { row: i, col: j });
                }
            }
            (maxima, minima)
        })
        .collect();

    let mut set = ExtremaSet::default();
    for (maxima, minima) in per_row {
        set.maxima.extend(maxima);
        set.minima.extend(minima);
    }
    set
}
