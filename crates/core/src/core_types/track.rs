//! Materialized storm tracks
//!
//! A track is one maximal chain of linked candidates, ordered by date. After
//! construction the point sequence is immutable; the field sampler annotates
//! the track in place with per-date derived quantities keyed by the same
//! dates.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core_types::candidate::CandidateId;
use crate::core_types::geo::GeoPos;

/// One point of a track: a candidate pinned to its date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub date: DateTime<Utc>,
    pub candidate: CandidateId,
    pub pos: GeoPos,
    pub strength: f64,
}

/// Auxiliary scalar samples read at the track's rounded grid cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AuxSample {
    /// Temperature at 850 hPa (K)
    pub t850: Option<f64>,
    /// Near-surface temperature (K)
    pub t995: Option<f64>,
    /// Convective available potential energy (J/kg)
    pub cape: Option<f64>,
    /// Precipitable water (kg/m2)
    pub pwat: Option<f64>,
}

/// Per-date derived quantities attached by the field sampler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackAnnotations {
    /// Peak windspeed inside the local window (m/s)
    pub max_windspeed: FxHashMap<DateTime<Utc>, f64>,
    /// Geographic position of the peak windspeed cell
    pub max_windspeed_pos: FxHashMap<DateTime<Utc>, GeoPos>,
    /// Refined local pressure minimum (Pa), when one was found
    pub pressure_min: FxHashMap<DateTime<Utc>, Option<f64>>,
    /// Position of the refined pressure minimum
    pub pressure_min_pos: FxHashMap<DateTime<Utc>, Option<GeoPos>>,
    /// Distance from the track position to the refined minimum
    pub pressure_min_dist: FxHashMap<DateTime<Utc>, Option<f64>>,
    /// Window mean pressure minus the refined minimum (Pa)
    pub ambient_pressure_diff: FxHashMap<DateTime<Utc>, Option<f64>>,
    /// Auxiliary scalar samples at the rounded centre cell
    pub aux: FxHashMap<DateTime<Utc>, AuxSample>,
}

/// A temporally ordered chain of candidates believed to be one storm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Which model realization this track came from
    pub ensemble_member: usize,
    /// Chronological points, dates strictly increasing
    points: Vec<TrackPoint>,
    /// Per-date derived quantities, keyed identically to the points
    pub annotations: TrackAnnotations,
}

impl Track {
    /// Build a track from chronological points
    ///
    /// # Panics
    ///
    /// Panics if the dates are not strictly increasing; the builder only ever
    /// walks successor links forward in time.
    #[must_use]
    pub fn new(ensemble_member: usize, points: Vec<TrackPoint>) -> Self {
        assert!(
            points.windows(2).all(|w| w[0].date < w[1].date),
            "Track dates must be strictly increasing"
        );
        Self {
            ensemble_member,
            points,
            annotations: TrackAnnotations::default(),
        }
    }

    #[must_use]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Number of dates in the track
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.date)
    }

    #[must_use]
    pub fn last_date(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.date)
    }

    /// Position of the track at a given date, if the track covers it
    #[must_use]
    pub fn pos_at(&self, date: DateTime<Utc>) -> Option<GeoPos> {
        self.points.iter().find(|p| p.date == date).map(|p| p.pos)
    }
}

/// All retained tracks of one ensemble member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberTracks {
    pub ensemble_member: usize,
    pub tracks: Vec<Track>,
}
