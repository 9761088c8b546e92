//! Materializing tracks from linked candidates
//!
//! Every candidate without a predecessor starts a chain; following successor
//! links forward yields one maximal chain per head. Chains shorter than the
//! configured minimum are discarded as noise. Because links are one-to-one
//! after resolution, the chains partition the candidate set.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_types::candidate::{CandidateId, CandidateSeries};
use crate::core_types::track::{MemberTracks, Track, TrackPoint};
use crate::error::TrackError;
use rustc_hash::FxHashSet;

/// Configuration of the track builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Minimum number of timesteps for a chain to count as a track
    pub min_length: usize,
}

impl Default for BuilderConfig {
    /// Six timesteps, 36 hours of 6-hourly data
    fn default() -> Self {
        Self { min_length: 6 }
    }
}

/// Materialize tracks from a fully linked candidate series
///
/// Tracks come out ordered by their head candidate (step, then slot).
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] if the successor chains do not
/// partition the candidate set, which indicates an unresolved or cyclic
/// link structure.
pub fn build_tracks(
    series: &CandidateSeries,
    ensemble_member: usize,
    config: &BuilderConfig,
) -> Result<MemberTracks, TrackError> {
    let mut visited: FxHashSet<CandidateId> = FxHashSet::default();
    let mut tracks = Vec::new();
    let mut discarded = 0usize;

    for (head, candidate) in series.iter_ids() {
        if !candidate.predecessors.is_empty() {
            continue;
        }
        let mut points = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(TrackError::Consistency(format!(
                    "candidate at step {} slot {} reached from two chain heads",
                    id.step, id.slot
                )));
            }
            let c = series.get(id);
            points.push(TrackPoint {
                date: c.date,
                candidate: id,
                pos: c.pos,
                strength: c.strength,
            });
            cursor = c.successor;
        }
        if points.len() >= config.min_length {
            tracks.push(Track::new(ensemble_member, points));
        } else {
            discarded += 1;
        }
    }

    if visited.len() != series.total_candidates() {
        return Err(TrackError::Consistency(format!(
            "chains cover {} of {} candidates; some candidate has a predecessor \
             that never claimed it",
            visited.len(),
            series.total_candidates()
        )));
    }

    info!(
        "Built {} tracks for member {ensemble_member} ({discarded} below length {})",
        tracks.len(),
        config.min_length
    );
    Ok(MemberTracks {
        ensemble_member,
        tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::candidate::{TimestepCandidates, VortexCandidate};
    use crate::core_types::geo::GeoPos;
    use crate::track::linker::{link_candidates, LinkerConfig};
    use crate::DistanceMetric;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2005, 10, 18, 0, 0, 0).unwrap()
            + chrono::Duration::hours(i64::from(h))
    }

    fn linked_series(steps: Vec<Vec<GeoPos>>) -> CandidateSeries {
        let mut series = CandidateSeries::new(
            steps
                .into_iter()
                .enumerate()
                .map(|(t, positions)| {
                    let h = u32::try_from(t).unwrap() * 6;
                    let mut candidates: Vec<VortexCandidate> = positions
                        .into_iter()
                        .map(|pos| VortexCandidate::new(date(h), pos, 3e-5))
                        .collect();
                    for (i, c) in candidates.iter_mut().enumerate() {
                        c.index = i;
                    }
                    TimestepCandidates {
                        date: date(h),
                        candidates,
                    }
                })
                .collect(),
        );
        let config = LinkerConfig {
            metric: DistanceMetric::Planar,
            cutoff: 5.0,
        };
        link_candidates(&mut series, &config).unwrap();
        series
    }

    #[test]
    fn test_long_chain_becomes_one_track() {
        let positions: Vec<Vec<GeoPos>> = (0..7)
            .map(|t| vec![GeoPos::new(280.0 + f64::from(t), 20.0)])
            .collect();
        let series = linked_series(positions);
        let member = build_tracks(&series, 3, &BuilderConfig::default()).unwrap();

        assert_eq!(member.ensemble_member, 3);
        assert_eq!(member.tracks.len(), 1);
        let track = &member.tracks[0];
        assert_eq!(track.len(), 7);
        assert_eq!(track.points()[0].pos.lon, 280.0);
        assert_eq!(track.points()[6].pos.lon, 286.0);
    }

    #[test]
    fn test_short_chains_are_discarded() {
        // One 3-step chain; default minimum is 6.
        let positions: Vec<Vec<GeoPos>> = (0..3)
            .map(|t| vec![GeoPos::new(280.0 + f64::from(t), 20.0)])
            .collect();
        let series = linked_series(positions);
        let member = build_tracks(&series, 0, &BuilderConfig::default()).unwrap();
        assert!(member.tracks.is_empty());

        let relaxed = BuilderConfig { min_length: 3 };
        let member = build_tracks(&series, 0, &relaxed).unwrap();
        assert_eq!(member.tracks.len(), 1);
    }

    #[test]
    fn test_parallel_chains_stay_separate() {
        let positions: Vec<Vec<GeoPos>> = (0..6)
            .map(|t| {
                vec![
                    GeoPos::new(280.0 + f64::from(t), 20.0),
                    GeoPos::new(300.0 + f64::from(t), 40.0),
                ]
            })
            .collect();
        let series = linked_series(positions);
        let member = build_tracks(&series, 0, &BuilderConfig::default()).unwrap();

        assert_eq!(member.tracks.len(), 2);
        assert!(member
            .tracks
            .iter()
            .any(|t| t.points()[0].pos == GeoPos::new(280.0, 20.0)));
        assert!(member
            .tracks
            .iter()
            .any(|t| t.points()[0].pos == GeoPos::new(300.0, 40.0)));
    }

    #[test]
    fn test_severed_chain_splits_into_two() {
        // Two heads converge on one step-1 candidate; the losing head ends
        // up as a single-point chain after its link is severed.
        let positions = vec![
            vec![GeoPos::new(278.0, 20.0), GeoPos::new(281.0, 20.0)],
            vec![GeoPos::new(280.0, 20.0)],
            vec![GeoPos::new(280.5, 20.0)],
        ];
        let series = linked_series(positions);
        let relaxed = BuilderConfig { min_length: 1 };
        let member = build_tracks(&series, 0, &relaxed).unwrap();

        // Winner chain of length 3, severed loser of length 1.
        let mut lengths: Vec<usize> = member.tracks.iter().map(Track::len).collect();
        lengths.sort_unstable();
        assert_eq!(lengths, vec![1, 3]);
    }
}
