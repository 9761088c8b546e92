//! Synthetic input fields for tests and demos
//!
//! Analytic cyclones on a regular 2-degree global grid: a Gaussian pressure
//! depression with a solid-body rotation core whose winds decay outwards.
//! Optional seeded noise on the pressure field keeps detection honest
//! without making runs irreproducible.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core_types::geo::GeoPos;
use crate::core_types::grid::{GridCoords, ScalarGrid};
use crate::data::{AuxFields, MemberSeries, StepFields};

/// One analytic cyclone
#[derive(Debug, Clone, Copy)]
pub struct SyntheticVortex {
    pub centre: GeoPos,
    /// Gaussian envelope sigma, degrees
    pub radius_deg: f64,
    /// Tangential wind per degree of offset inside the core (m/s per degree)
    pub wind_scale: f64,
    /// Central pressure depression (Pa)
    pub pressure_drop: f64,
}

impl SyntheticVortex {
    #[must_use]
    pub fn at(centre: GeoPos) -> Self {
        Self {
            centre,
            radius_deg: 6.0,
            wind_scale: 5.0,
            pressure_drop: 2000.0,
        }
    }
}

/// Regular 2-degree global coordinates, latitudes north to south
#[must_use]
pub fn global_coords_2deg() -> GridCoords {
    let lons: Vec<f64> = (0..180).map(|i| f64::from(i) * 2.0).collect();
    let lats: Vec<f64> = (0..91).map(|i| 90.0 - f64::from(i) * 2.0).collect();
    GridCoords::new(lons, lats)
}

/// Shortest signed longitude offset, degrees in [-180, 180)
fn wrapped_dlon(lon: f64, centre_lon: f64) -> f64 {
    (lon - centre_lon + 180.0).rem_euclid(360.0) - 180.0
}

/// One timestep's fields with the given cyclones stamped in
///
/// `psl_noise` is the amplitude (Pa) of uniform noise added to the pressure
/// field from the supplied generator; winds stay noise-free so the derived
/// vorticity stays analytic.
#[must_use]
pub fn vortex_step(
    coords: &GridCoords,
    vortices: &[SyntheticVortex],
    psl_noise: f64,
    rng: &mut StdRng,
) -> StepFields {
    let (rows, cols) = coords.shape();
    let mut psl = ScalarGrid::from_fn(rows, cols, |_, _| 101_325.0);
    if psl_noise > 0.0 {
        for cell in psl.as_mut_slice() {
            *cell += rng.random_range(-psl_noise..psl_noise);
        }
    }
    let mut u = ScalarGrid::zeros(rows, cols);
    let mut v = ScalarGrid::zeros(rows, cols);

    for vortex in vortices {
        for i in 0..rows {
            for j in 0..cols {
                let pos = coords.geo_at(i, j);
                let dlon = wrapped_dlon(pos.lon, vortex.centre.lon);
                let dlat = pos.lat - vortex.centre.lat;
                let r2 = dlon * dlon + dlat * dlat;
                let env = (-r2 / (2.0 * vortex.radius_deg * vortex.radius_deg)).exp();

                psl.set(i, j, psl.get(i, j) - vortex.pressure_drop * env);
                // Counter-clockwise rotation, northern-hemisphere cyclonic.
                u.set(i, j, u.get(i, j) - dlat * vortex.wind_scale * env);
                v.set(i, j, v.get(i, j) + dlon * vortex.wind_scale * env);
            }
        }
    }

    // Simple climatological profiles so aux sampling has something to read.
    let t850 = ScalarGrid::from_fn(rows, cols, |i, _| {
        288.0 - 0.35 * coords.lats()[i].abs()
    });
    let pwat = ScalarGrid::from_fn(rows, cols, |i, _| {
        55.0 * (coords.lats()[i].to_radians().cos()).powi(2)
    });
    StepFields {
        psl,
        u,
        v,
        aux: AuxFields {
            t850: Some(t850),
            pwat: Some(pwat),
            ..AuxFields::default()
        },
    }
}

/// A member series with one cyclone translating at constant velocity
///
/// The cyclone starts at `start_pos` and moves `(dlon, dlat)` degrees per
/// 6-hourly step.
#[must_use]
pub fn moving_vortex_series(
    start_date: DateTime<Utc>,
    n_steps: usize,
    start_pos: GeoPos,
    dlon: f64,
    dlat: f64,
    seed: u64,
) -> MemberSeries {
    let coords = global_coords_2deg();
    let mut rng = StdRng::seed_from_u64(seed);

    let dates: Vec<DateTime<Utc>> = (0..n_steps)
        .map(|s| start_date + Duration::hours(6 * s as i64))
        .collect();
    let steps: Vec<StepFields> = (0..n_steps)
        .map(|s| {
            let centre = GeoPos::new(
                (start_pos.lon + dlon * s as f64).rem_euclid(360.0),
                start_pos.lat + dlat * s as f64,
            );
            vortex_step(&coords, &[SyntheticVortex::at(centre)], 5.0, &mut rng)
        })
        .collect();
    MemberSeries::new(coords, dates, steps)
}
