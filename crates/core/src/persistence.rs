//! Saving and loading tracking results
//!
//! Results are serialized as JSON, one file per run. The format is the
//! serde representation of [`MemberTracks`]; fields keyed by date use the
//! RFC 3339 form chrono emits by default.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use crate::core_types::track::MemberTracks;

/// Errors that can occur during save/load operations
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "IO error: {e}"),
            PersistenceError::Serialization(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            PersistenceError::Serialization(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e)
    }
}

/// Write tracking results to a JSON file
///
/// # Errors
///
/// Returns [`PersistenceError`] on IO or serialization failure.
pub fn save_tracks(path: &Path, results: &[MemberTracks]) -> Result<(), PersistenceError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), results)?;
    info!("Saved {} member result sets to {}", results.len(), path.display());
    Ok(())
}

/// Read tracking results back from a JSON file
///
/// # Errors
///
/// Returns [`PersistenceError`] on IO or deserialization failure.
pub fn load_tracks(path: &Path) -> Result<Vec<MemberTracks>, PersistenceError> {
    let file = File::open(path)?;
    let results = serde_json::from_reader(BufReader::new(file))?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::candidate::CandidateId;
    use crate::core_types::geo::GeoPos;
    use crate::core_types::track::{Track, TrackPoint};
    use chrono::{TimeZone, Utc};

    fn sample_results() -> Vec<MemberTracks> {
        let points: Vec<TrackPoint> = (0..3)
            .map(|s| TrackPoint {
                date: Utc.with_ymd_and_hms(2005, 10, 18, 6 * s, 0, 0).unwrap(),
                candidate: CandidateId {
                    step: s as usize,
                    slot: 0,
                },
                pos: GeoPos::new(280.0 + f64::from(s), 20.0),
                strength: 3e-5,
            })
            .collect();
        let mut track = Track::new(2, points.clone());
        track
            .annotations
            .max_windspeed
            .insert(points[0].date, 31.5);
        track
            .annotations
            .pressure_min
            .insert(points[0].date, Some(99_800.0));
        vec![MemberTracks {
            ensemble_member: 2,
            tracks: vec![track],
        }]
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.json");

        let original = sample_results();
        save_tracks(&path, &original).unwrap();
        let loaded = load_tracks(&path).unwrap();

        assert_eq!(loaded, original, "results must survive a roundtrip");
        let track = &loaded[0].tracks[0];
        assert_eq!(track.len(), 3);
        assert_eq!(
            track.annotations.max_windspeed[&track.first_date().unwrap()],
            31.5
        );
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tracks(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)), "got {err}");
    }
}
