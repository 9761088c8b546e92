//! Gridded scalar fields and coordinate arrays
//!
//! Fields are stored as flat `Vec<f64>` in row-major order (row = latitude
//! index, column = longitude index). Coordinate arrays are 1D and must match
//! the grid shape; longitude wraps at 360 degrees, latitude does not.

use serde::{Deserialize, Serialize};

use crate::core_types::geo::{GeoPos, EARTH_CIRC_M};
use crate::error::TrackError;

/// A rectangular scalar field over a lon/lat grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarGrid {
    /// Field values in row-major order (row * cols + col)
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl ScalarGrid {
    /// New grid initialized to zero
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Wrap an existing row-major buffer
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    #[must_use]
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Grid buffer length must match shape"
        );
        Self { data, rows, cols }
    }

    /// Build a grid from a per-cell function of (row, col)
    #[must_use]
    pub fn from_fn<F: FnMut(usize, usize) -> f64>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { data, rows, cols }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "Coordinates out of bounds"
        );
        self.data[self.index(row, col)]
    }

    /// Value at grid position with the column wrapped mod width
    #[inline]
    #[must_use]
    pub fn get_wrapped(&self, row: usize, col: isize) -> f64 {
        let cols = self.cols as isize;
        let wrapped = col.rem_euclid(cols) as usize;
        self.data[self.index(row, wrapped)]
    }

    /// Set value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.rows && col < self.cols,
            "Coordinates out of bounds"
        );
        let idx = self.index(row, col);
        self.data[idx] = value;
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Mean of all cells
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Maximum absolute cell-wise difference against another grid
    ///
    /// # Panics
    ///
    /// Panics if shapes differ.
    #[must_use]
    pub fn max_abs_diff(&self, other: &ScalarGrid) -> f64 {
        assert_eq!(self.rows, other.rows, "Grid shapes must match");
        assert_eq!(self.cols, other.cols, "Grid shapes must match");
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Grid spacing derived once from the coordinate arrays
///
/// Both spacings span two grid cells so they divide central differences
/// directly: `dx[row]` is the signed east-west distance (m) across columns
/// `j-1..j+1` at that row's latitude, `dy` the signed south-north distance
/// (m) across rows `i-1..i+1`. Meters, so that vorticity from m/s winds
/// comes out in 1/s.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpacing {
    /// Per-row east-west spacing (m), varies with latitude
    pub dx: Vec<f64>,
    /// South-north spacing (m), constant; negative when latitudes descend
    /// with the row index
    pub dy: f64,
}

/// The 1D longitude/latitude coordinate arrays of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCoords {
    lons: Vec<f64>,
    lats: Vec<f64>,
}

/// Tolerance for matching a geographic coordinate to a grid coordinate
const COORD_EPS: f64 = 1e-6;

impl GridCoords {
    /// New coordinate arrays
    ///
    /// # Panics
    ///
    /// Panics if either array has fewer than 3 entries (the finite-difference
    /// stencils and spacing derivation need at least that).
    #[must_use]
    pub fn new(lons: Vec<f64>, lats: Vec<f64>) -> Self {
        assert!(lons.len() >= 3, "Need at least 3 longitude samples");
        assert!(lats.len() >= 3, "Need at least 3 latitude samples");
        Self { lons, lats }
    }

    #[must_use]
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    #[must_use]
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Expected grid shape (rows, cols)
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.lats.len(), self.lons.len())
    }

    /// Check a field's shape against these coordinates
    #[must_use]
    pub fn matches(&self, grid: &ScalarGrid) -> bool {
        grid.rows() == self.lats.len() && grid.cols() == self.lons.len()
    }

    /// Longitude grid resolution in degrees (single cell)
    #[must_use]
    pub fn lon_resolution(&self) -> f64 {
        (self.lons[1] - self.lons[0]).abs()
    }

    /// Latitude grid resolution in degrees (single cell)
    #[must_use]
    pub fn lat_resolution(&self) -> f64 {
        (self.lats[1] - self.lats[0]).abs()
    }

    /// Derive the finite-difference spacing from the coordinate arrays
    ///
    /// East-west spacing shrinks with the cosine of latitude; north-south
    /// spacing is constant. Both span two cells and both are signed by the
    /// axis direction, so derivatives taken along the row/column index come
    /// out in geographic orientation (`dy` is negative for the usual
    /// north-to-south latitude ordering).
    #[must_use]
    pub fn spacing(&self) -> GridSpacing {
        let dlon = self.lons[2] - self.lons[0];
        let dlat = self.lats[2] - self.lats[0];
        let dx = self
            .lats
            .iter()
            .map(|lat| dlon / 360.0 * lat.to_radians().cos() * EARTH_CIRC_M)
            .collect();
        GridSpacing {
            dx,
            dy: dlat / 360.0 * EARTH_CIRC_M,
        }
    }

    /// Geographic position of a grid cell
    #[must_use]
    pub fn geo_at(&self, row: usize, col: usize) -> GeoPos {
        GeoPos::new(self.lons[col], self.lats[row])
    }

    /// Geographic position of a grid cell with the column wrapped mod width
    #[must_use]
    pub fn geo_at_wrapped(&self, row: usize, col: isize) -> GeoPos {
        let cols = self.lons.len() as isize;
        let wrapped = col.rem_euclid(cols) as usize;
        GeoPos::new(self.lons[wrapped], self.lats[row])
    }

    /// Exact index of a longitude value
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Lookup`] when the value is not present in the
    /// coordinate array. This should not occur given aligned grids.
    pub fn lon_index(&self, lon: f64) -> Result<usize, TrackError> {
        self.lons
            .iter()
            .position(|&l| (l - lon).abs() < COORD_EPS)
            .ok_or_else(|| TrackError::Lookup(format!("Longitude {lon} not on the grid")))
    }

    /// Exact index of a latitude value
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Lookup`] when the value is not present in the
    /// coordinate array.
    pub fn lat_index(&self, lat: f64) -> Result<usize, TrackError> {
        self.lats
            .iter()
            .position(|&l| (l - lat).abs() < COORD_EPS)
            .ok_or_else(|| TrackError::Lookup(format!("Latitude {lat} not on the grid")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn coords_2deg() -> GridCoords {
        let lons: Vec<f64> = (0..180).map(|i| f64::from(i) * 2.0).collect();
        let lats: Vec<f64> = (0..91).map(|i| 90.0 - f64::from(i) * 2.0).collect();
        GridCoords::new(lons, lats)
    }

    #[test]
    fn test_grid_roundtrip_and_shape() {
        let mut grid = ScalarGrid::zeros(4, 6);
        grid.set(2, 5, 3.25);
        assert_eq!(grid.get(2, 5), 3.25);
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.cols(), 6);
    }

    #[test]
    fn test_wrapped_column_access() {
        let grid = ScalarGrid::from_fn(3, 5, |_, j| j as f64);
        assert_eq!(grid.get_wrapped(1, -1), 4.0);
        assert_eq!(grid.get_wrapped(1, 5), 0.0);
        assert_eq!(grid.get_wrapped(1, 6), 1.0);
    }

    #[test]
    fn test_spacing_varies_with_latitude() {
        let coords = coords_2deg();
        let spacing = coords.spacing();
        // 4 degrees of longitude at the equator (row of lat 0).
        let eq_row = coords.lat_index(0.0).unwrap();
        assert_relative_eq!(
            spacing.dx[eq_row],
            4.0 / 360.0 * EARTH_CIRC_M,
            max_relative = 1e-12
        );
        // At the pole the east-west spacing collapses.
        assert!(spacing.dx[0].abs() < 1e-6);
        // Latitudes run north to south, so dy is negative.
        assert_relative_eq!(spacing.dy, -4.0 / 360.0 * EARTH_CIRC_M, max_relative = 1e-12);
    }

    #[test]
    fn test_lookup_error_on_off_grid_position() {
        let coords = coords_2deg();
        assert!(coords.lon_index(86.0).is_ok());
        let err = coords.lon_index(86.5).unwrap_err();
        assert!(matches!(err, TrackError::Lookup(_)));
    }

    #[test]
    fn test_mean_and_max_abs_diff() {
        let a = ScalarGrid::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        let b = ScalarGrid::from_vec(vec![1.0, 2.5, 3.0, 4.0], 2, 2);
        assert_relative_eq!(a.mean(), 2.5);
        assert_relative_eq!(a.max_abs_diff(&b), 0.5);
    }
}
