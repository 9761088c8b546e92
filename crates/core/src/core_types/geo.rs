//! Geographic positions and spherical distance metrics
//!
//! Positions are plain (longitude, latitude) pairs in degrees, longitude in
//! [0, 360). The default spatial metric is true great-circle distance on a
//! spherical Earth; a planar Euclidean metric on raw (lon, lat) values is
//! kept for cheap screening and for reproducing older grid-step cutoffs.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth circumference (km)
pub const EARTH_CIRC_KM: f64 = EARTH_RADIUS_KM * 2.0 * std::f64::consts::PI;

/// Earth circumference (m)
pub const EARTH_CIRC_M: f64 = EARTH_CIRC_KM * 1000.0;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Longitude in degrees, [0, 360)
    pub lon: f64,
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
}

impl GeoPos {
    #[must_use]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Unit vector on the sphere for this position
    fn unit_vector(self) -> Vector3<f64> {
        let lon = self.lon.to_radians();
        let lat = self.lat.to_radians();
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
    }
}

/// Great-circle distance between two positions (km)
///
/// Computed from the angle between the positions' unit vectors, which is
/// well conditioned at both small and antipodal separations.
#[must_use]
pub fn great_circle_dist(a: GeoPos, b: GeoPos) -> f64 {
    let va = a.unit_vector();
    let vb = b.unit_vector();
    let angle = va.cross(&vb).norm().atan2(va.dot(&vb));
    angle * EARTH_RADIUS_KM
}

/// Planar Euclidean distance on raw (lon, lat) degrees
///
/// No longitude wraparound; only meaningful for nearby positions away from
/// the 0/360 seam.
#[must_use]
pub fn planar_dist(a: GeoPos, b: GeoPos) -> f64 {
    ((a.lon - b.lon).powi(2) + (a.lat - b.lat).powi(2)).sqrt()
}

/// Closed set of spatial distance metrics
///
/// Checked exhaustively at compile time; there is deliberately no string
/// dispatch for metric selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// True great-circle distance (km), the default
    #[default]
    GreatCircle,
    /// Euclidean distance on raw (lon, lat) degrees
    Planar,
}

impl DistanceMetric {
    /// Distance between two positions under this metric
    ///
    /// Units differ per metric: km for `GreatCircle`, degrees for `Planar`.
    /// Cutoffs must be expressed in the same metric, see
    /// [`DistanceMetric::grid_step_cutoff`].
    #[must_use]
    pub fn distance(self, a: GeoPos, b: GeoPos) -> f64 {
        match self {
            DistanceMetric::GreatCircle => great_circle_dist(a, b),
            DistanceMetric::Planar => planar_dist(a, b),
        }
    }

    /// Cutoff equivalent to `steps` grid steps of `step_deg` degrees at the
    /// equator, expressed in this metric's units
    #[must_use]
    pub fn grid_step_cutoff(self, step_deg: f64, steps: f64) -> f64 {
        match self {
            DistanceMetric::GreatCircle => {
                great_circle_dist(GeoPos::new(0.0, 0.0), GeoPos::new(step_deg, 0.0)) * steps
            }
            DistanceMetric::Planar => step_deg * steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_great_circle_quarter_turn() {
        let a = GeoPos::new(0.0, 0.0);
        let b = GeoPos::new(90.0, 0.0);
        assert_relative_eq!(
            great_circle_dist(a, b),
            EARTH_CIRC_KM / 4.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_great_circle_symmetric_and_zero() {
        let a = GeoPos::new(280.0, 23.5);
        let b = GeoPos::new(284.0, 25.0);
        assert_relative_eq!(great_circle_dist(a, b), great_circle_dist(b, a));
        assert_relative_eq!(great_circle_dist(a, a), 0.0);
    }

    #[test]
    fn test_great_circle_shrinks_with_latitude() {
        // Two degrees of longitude cover less ground at 60N than at the equator.
        let at_equator = great_circle_dist(GeoPos::new(0.0, 0.0), GeoPos::new(2.0, 0.0));
        let at_60n = great_circle_dist(GeoPos::new(0.0, 60.0), GeoPos::new(2.0, 60.0));
        assert!(at_60n < at_equator * 0.6, "{at_60n} vs {at_equator}");
    }

    #[test]
    fn test_grid_step_cutoff_units() {
        let gc = DistanceMetric::GreatCircle.grid_step_cutoff(2.0, 5.0);
        let planar = DistanceMetric::Planar.grid_step_cutoff(2.0, 5.0);
        assert_relative_eq!(planar, 10.0);
        // 2 degrees at the equator is ~222 km.
        assert_relative_eq!(gc, EARTH_CIRC_KM / 180.0 * 5.0, max_relative = 1e-12);
    }
}
