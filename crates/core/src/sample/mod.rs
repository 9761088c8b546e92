//! Annotating tracks with local field statistics
//!
//! For every point of a finished track the sampler rounds the position to
//! the nearest grid cell, cuts a square window around it and reads off the
//! peak windspeed, the refined local pressure minimum nearest the original
//! (pre-rounded) position, the ambient pressure excess over that minimum,
//! and the auxiliary scalars at the centre cell. Columns wrap across the
//! longitude seam; latitude rows clamp at the grid edge, so windows near
//! the poles shrink instead of wrapping.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_types::geo::{DistanceMetric, GeoPos};
use crate::core_types::grid::{GridCoords, ScalarGrid};
use crate::core_types::track::{AuxSample, Track, TrackPoint};
use crate::data::{MemberSeries, StepFields};
use crate::error::TrackError;
use crate::fields::extrema::find_extrema;

/// Configuration of the field sampler
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Window side length in cells; must be odd
    pub window: usize,
    /// Distance metric for picking the nearest refined pressure minimum
    pub metric: DistanceMetric,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            window: 11,
            metric: DistanceMetric::GreatCircle,
        }
    }
}

/// Everything the sampler reads from one window
#[derive(Debug, Clone, Copy)]
struct WindowStats {
    max_windspeed: f64,
    max_windspeed_pos: GeoPos,
    pressure_min: Option<f64>,
    pressure_min_pos: Option<GeoPos>,
    pressure_min_dist: Option<f64>,
    ambient_pressure_diff: Option<f64>,
    aux: AuxSample,
}

/// Round a position to the nearest grid cell and return its (row, col)
///
/// # Errors
///
/// Returns [`TrackError::Lookup`] when the rounded position falls off the
/// coordinate arrays.
fn rounded_indices(coords: &GridCoords, pos: GeoPos) -> Result<(usize, usize), TrackError> {
    let lons = coords.lons();
    let lats = coords.lats();
    let lon_step = lons[1] - lons[0];
    let lat_step = lats[1] - lats[0];
    let lon = lons[0] + ((pos.lon - lons[0]) / lon_step).round() * lon_step;
    let lat = lats[0] + ((pos.lat - lats[0]) / lat_step).round() * lat_step;
    Ok((coords.lat_index(lat)?, coords.lon_index(lon)?))
}

fn sample_window(
    fields: &StepFields,
    coords: &GridCoords,
    pos: GeoPos,
    config: &SamplerConfig,
) -> Result<WindowStats, TrackError> {
    let (centre_row, centre_col) = rounded_indices(coords, pos)?;
    let half = (config.window / 2) as isize;
    let rows = coords.lats().len() as isize;
    let row_lo = (centre_row as isize - half).max(0) as usize;
    let row_hi = (centre_row as isize + half).min(rows - 1) as usize;

    let mut max_windspeed = f64::NEG_INFINITY;
    let mut max_windspeed_pos = coords.geo_at(centre_row, centre_col);
    let mut psl_sum = 0.0;
    let mut cells = 0usize;
    for i in row_lo..=row_hi {
        for dj in -half..=half {
            let j = centre_col as isize + dj;
            let speed = fields.u.get_wrapped(i, j).hypot(fields.v.get_wrapped(i, j));
            if speed > max_windspeed {
                max_windspeed = speed;
                max_windspeed_pos = coords.geo_at_wrapped(i, j);
            }
            psl_sum += fields.psl.get_wrapped(i, j);
            cells += 1;
        }
    }
    let window_mean = psl_sum / cells as f64;

    // Refined pressure minimum: the extrema scan runs on the extracted
    // sub-grid, so its columns wrap within the window and minima on the
    // east/west edge columns are eligible. The nearest one to the original
    // (pre-rounded) track position wins.
    let window_psl = ScalarGrid::from_fn(row_hi - row_lo + 1, config.window, |wi, wj| {
        let j = centre_col as isize + wj as isize - half;
        fields.psl.get_wrapped(row_lo + wi, j)
    });
    let mut best: Option<(f64, GeoPos, f64)> = None;
    for p in find_extrema(&window_psl).minima {
        let j = centre_col as isize + p.col as isize - half;
        let min_pos = coords.geo_at_wrapped(row_lo + p.row, j);
        let dist = config.metric.distance(pos, min_pos);
        if best.is_none_or(|(_, _, d)| dist < d) {
            best = Some((window_psl.get(p.row, p.col), min_pos, dist));
        }
    }

    let aux = AuxSample {
        t850: fields.aux.t850.as_ref().map(|g| g.get(centre_row, centre_col)),
        t995: fields.aux.t995.as_ref().map(|g| g.get(centre_row, centre_col)),
        cape: fields.aux.cape.as_ref().map(|g| g.get(centre_row, centre_col)),
        pwat: fields.aux.pwat.as_ref().map(|g| g.get(centre_row, centre_col)),
    };

    Ok(WindowStats {
        max_windspeed,
        max_windspeed_pos,
        pressure_min: best.map(|(v, _, _)| v),
        pressure_min_pos: best.map(|(_, p, _)| p),
        pressure_min_dist: best.map(|(_, _, d)| d),
        ambient_pressure_diff: best.map(|(v, _, _)| window_mean - v),
        aux,
    })
}

fn sample_track(
    member: &MemberSeries,
    track: &mut Track,
    config: &SamplerConfig,
) -> Result<(), TrackError> {
    let points: Vec<TrackPoint> = track.points().to_vec();
    for point in points {
        let step_idx = member.date_index(point.date)?;
        let stats = sample_window(&member.steps()[step_idx], member.coords(), point.pos, config)?;

        let a = &mut track.annotations;
        a.max_windspeed.insert(point.date, stats.max_windspeed);
        a.max_windspeed_pos
            .insert(point.date, stats.max_windspeed_pos);
        a.pressure_min.insert(point.date, stats.pressure_min);
        a.pressure_min_pos
            .insert(point.date, stats.pressure_min_pos);
        a.pressure_min_dist
            .insert(point.date, stats.pressure_min_dist);
        a.ambient_pressure_diff
            .insert(point.date, stats.ambient_pressure_diff);
        a.aux.insert(point.date, stats.aux);
    }
    Ok(())
}

/// Annotate every track with local field statistics, in parallel
///
/// # Errors
///
/// Returns [`TrackError::Range`] for a track date outside the series and
/// [`TrackError::Lookup`] when a track position rounds off the grid.
pub fn sample_tracks(
    member: &MemberSeries,
    tracks: &mut [Track],
    config: &SamplerConfig,
) -> Result<(), TrackError> {
    assert!(config.window % 2 == 1, "Sampler window must be odd");
    info!("Sampling fields along {} tracks", tracks.len());
    tracks
        .par_iter_mut()
        .try_for_each(|track| sample_track(member, track, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::candidate::CandidateId;
    use crate::core_types::grid::ScalarGrid;
    use crate::data::AuxFields;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2005, 10, 18, 0, 0, 0).unwrap()
    }

    /// A 2-degree grid with a pressure low and a wind ring around (4, 6)
    fn series_with_low() -> MemberSeries {
        let lons: Vec<f64> = (0..13).map(|i| f64::from(i) * 2.0).collect();
        let lats: Vec<f64> = (0..9).map(|i| 20.0 - f64::from(i) * 2.0).collect();
        let coords = GridCoords::new(lons, lats);
        let (rows, cols) = coords.shape();

        let (ci, cj) = (4.0, 6.0);
        let psl = ScalarGrid::from_fn(rows, cols, |i, j| {
            let (di, dj) = (i as f64 - ci, j as f64 - cj);
            101_325.0 - 2000.0 * (-(di * di + dj * dj) / 4.0).exp()
        });
        let u = ScalarGrid::from_fn(rows, cols, |i, j| {
            let (di, dj) = (i as f64 - ci, j as f64 - cj);
            -di * (-(di * di + dj * dj) / 4.0).exp() * 10.0
        });
        let v = ScalarGrid::from_fn(rows, cols, |i, j| {
            let (di, dj) = (i as f64 - ci, j as f64 - cj);
            dj * (-(di * di + dj * dj) / 4.0).exp() * 10.0
        });
        let aux = AuxFields {
            t850: Some(ScalarGrid::from_fn(rows, cols, |_, _| 290.0)),
            ..AuxFields::default()
        };
        MemberSeries::new(coords, vec![date()], vec![StepFields { psl, u, v, aux }])
    }

    fn track_at(pos: GeoPos) -> Track {
        Track::new(
            0,
            vec![TrackPoint {
                date: date(),
                candidate: CandidateId { step: 0, slot: 0 },
                pos,
                strength: 3e-5,
            }],
        )
    }

    #[test]
    fn test_window_statistics_at_a_planted_low() {
        let member = series_with_low();
        // Slightly off the cell centre; rounds to row 4, col 6 (12E, 12N).
        let mut tracks = vec![track_at(GeoPos::new(12.4, 11.7))];
        let config = SamplerConfig {
            metric: DistanceMetric::Planar,
            ..SamplerConfig::default()
        };
        sample_tracks(&member, &mut tracks, &config).unwrap();

        let a = &tracks[0].annotations;
        let pmin = a.pressure_min[&date()].expect("the low must be refined");
        assert_relative_eq!(pmin, 101_325.0 - 2000.0, max_relative = 1e-12);
        assert_eq!(a.pressure_min_pos[&date()], Some(GeoPos::new(12.0, 12.0)));

        let dist = a.pressure_min_dist[&date()].unwrap();
        assert!(dist > 0.0 && dist < 1.0, "pre-rounded offset expected: {dist}");

        let ambient = a.ambient_pressure_diff[&date()].unwrap();
        assert!(ambient > 0.0, "window mean must exceed the minimum");

        assert!(a.max_windspeed[&date()] > 0.0);
        assert_eq!(a.aux[&date()].t850, Some(290.0));
        assert_eq!(a.aux[&date()].cape, None);
    }

    #[test]
    fn test_window_clamps_at_the_grid_edge() {
        let member = series_with_low();
        // Rounds to the top row; the window must shrink, not wrap or panic.
        let mut tracks = vec![track_at(GeoPos::new(12.0, 19.6))];
        sample_tracks(&member, &mut tracks, &SamplerConfig::default()).unwrap();
        assert!(tracks[0].annotations.max_windspeed[&date()] >= 0.0);
    }

    #[test]
    fn test_off_grid_position_is_a_lookup_error() {
        let member = series_with_low();
        let mut tracks = vec![track_at(GeoPos::new(300.0, 12.0))];
        let err = sample_tracks(&member, &mut tracks, &SamplerConfig::default()).unwrap_err();
        assert!(matches!(err, TrackError::Lookup(_)), "got {err}");
    }

    #[test]
    fn test_edge_column_minimum_found_by_window_wrap() {
        // Pressure falls monotonically eastward, so the lowest window column
        // qualifies as a minimum only through the window's own column
        // wraparound, never on the parent grid.
        let lons: Vec<f64> = (0..13).map(|i| f64::from(i) * 2.0).collect();
        let lats: Vec<f64> = (0..9).map(|i| 20.0 - f64::from(i) * 2.0).collect();
        let coords = GridCoords::new(lons, lats);
        let (rows, cols) = coords.shape();
        let member = MemberSeries::new(
            coords,
            vec![date()],
            vec![StepFields {
                psl: ScalarGrid::from_fn(rows, cols, |_, j| 101_325.0 - 10.0 * j as f64),
                u: ScalarGrid::zeros(rows, cols),
                v: ScalarGrid::zeros(rows, cols),
                aux: AuxFields::default(),
            }],
        );
        let mut tracks = vec![track_at(GeoPos::new(12.0, 12.0))];
        let config = SamplerConfig {
            metric: DistanceMetric::Planar,
            ..SamplerConfig::default()
        };
        sample_tracks(&member, &mut tracks, &config).unwrap();

        let a = &tracks[0].annotations;
        assert_eq!(
            a.pressure_min[&date()],
            Some(101_215.0),
            "the east edge column of the window must be eligible"
        );
        assert_eq!(a.pressure_min_pos[&date()], Some(GeoPos::new(22.0, 12.0)));
        assert!(a.ambient_pressure_diff[&date()].unwrap() > 0.0);
    }

    #[test]
    fn test_peak_windspeed_stays_inside_the_window_across_the_seam() {
        use crate::synthetic::{global_coords_2deg, vortex_step, SyntheticVortex};
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        // A vortex near the longitude seam; the window columns wrap through
        // it, and the reported peak position must come from those columns.
        let coords = global_coords_2deg();
        let mut rng = StdRng::seed_from_u64(7);
        let step = vortex_step(
            &coords,
            &[SyntheticVortex::at(GeoPos::new(2.0, 20.0))],
            0.0,
            &mut rng,
        );
        let member = MemberSeries::new(coords, vec![date()], vec![step]);
        let mut tracks = vec![track_at(GeoPos::new(2.0, 20.0))];
        sample_tracks(&member, &mut tracks, &SamplerConfig::default()).unwrap();

        let pos = tracks[0].annotations.max_windspeed_pos[&date()];
        let coords = member.coords();
        let centre_row = 35usize;
        let centre_col = 1isize;
        let allowed: Vec<f64> = (-5..=5)
            .map(|dj| coords.geo_at_wrapped(centre_row, centre_col + dj).lon)
            .collect();
        assert!(
            allowed.contains(&pos.lon),
            "peak windspeed longitude {} must come from a window column",
            pos.lon
        );
        assert!(
            pos.lat <= coords.lats()[centre_row - 5] && pos.lat >= coords.lats()[centre_row + 5],
            "peak windspeed latitude {} must lie inside the window rows",
            pos.lat
        );
    }

    #[test]
    fn test_flat_pressure_yields_no_refined_minimum() {
        let lons: Vec<f64> = (0..13).map(|i| f64::from(i) * 2.0).collect();
        let lats: Vec<f64> = (0..9).map(|i| 20.0 - f64::from(i) * 2.0).collect();
        let coords = GridCoords::new(lons, lats);
        let (rows, cols) = coords.shape();
        let member = MemberSeries::new(
            coords,
            vec![date()],
            vec![StepFields {
                psl: ScalarGrid::from_fn(rows, cols, |_, _| 101_325.0),
                u: ScalarGrid::zeros(rows, cols),
                v: ScalarGrid::zeros(rows, cols),
                aux: AuxFields::default(),
            }],
        );
        let mut tracks = vec![track_at(GeoPos::new(12.0, 12.0))];
        sample_tracks(&member, &mut tracks, &SamplerConfig::default()).unwrap();

        let a = &tracks[0].annotations;
        assert_eq!(a.pressure_min[&date()], None);
        assert_eq!(a.ambient_pressure_diff[&date()], None);
    }
}
